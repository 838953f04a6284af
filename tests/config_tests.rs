//! Loading driver configuration from disk.

use ebyte_rs::{DeviceConfig, EbyteError, Parity, SerialSettings};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{
            "serial_port": "/dev/ttyAMA0",
            "pins": {{ "m0": 17, "m1": 27, "aux": 22 }},
            "timing": {{ "wait_timeout_ms": 500, "response_delay_ms": 100 }},
            "read_buffer_size": 256
        }}"#
    )
    .unwrap();

    let config = DeviceConfig::load(file.path()).unwrap();
    assert_eq!(config.serial_port, "/dev/ttyAMA0");
    assert_eq!((config.pins.m0, config.pins.m1, config.pins.aux), (17, 27, 22));
    assert_eq!(config.timing.wait_timeout, Duration::from_millis(500));
    assert_eq!(config.timing.response_delay, Duration::from_millis(100));
    assert_eq!(config.timing.mode_settle, Duration::from_millis(200));
    assert_eq!(config.serial, SerialSettings::new(9600, Parity::None));
    assert_eq!(config.read_buffer_size, 256);
}

#[test]
fn test_saved_config_loads_back() {
    let mut config = DeviceConfig::default();
    config.serial_port = "/dev/ttyUSB0".into();
    config.timing.read_timeout = Duration::from_millis(750);

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config.to_json_pretty().unwrap().as_bytes()).unwrap();

    assert_eq!(DeviceConfig::load(file.path()).unwrap(), config);
}

#[test]
fn test_invalid_json_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ \"serial_port\": 5 ").unwrap();

    assert!(matches!(DeviceConfig::load(file.path()), Err(EbyteError::Config(_))));
}

#[test]
fn test_missing_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = DeviceConfig::load(dir.path().join("missing.json")).unwrap_err();
    match err {
        EbyteError::Config(msg) => assert!(msg.contains("missing.json")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_shared_pins_rejected() {
    let result = DeviceConfig::from_json_str(r#"{ "pins": { "m0": 5, "m1": 5, "aux": 6 } }"#);
    assert!(matches!(result, Err(EbyteError::Config(_))));
}
