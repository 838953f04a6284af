//! Tests for the busy-signal synchronizer against the simulated module.


use ebyte_rs::hal::mock::MockDevice;
use ebyte_rs::{ChipMode, EbyteError, Parity, SerialSettings, TimeoutKind, Timing};
use mock_support::{fast_timing, open_handler, open_handler_with_timing};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::sleep;

const SLEEP_SETTINGS: SerialSettings = SerialSettings::new(9600, Parity::None);

#[tokio::test]
async fn test_opens_link_with_initial_settings() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;

    assert_eq!(device.opened_settings(), vec![SLEEP_SETTINGS]);
    assert_eq!(handler.active_serial_settings().await, SLEEP_SETTINGS);
    assert_eq!(handler.staged_serial_settings(), SLEEP_SETTINGS);
    assert_eq!(handler.mode().unwrap(), ChipMode::Sleep);
}

#[tokio::test]
async fn test_write_waits_for_ack() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let handler = open_handler(&device).await;

    tokio_test::assert_ok!(handler.write_serial(b"hello").await);
    assert_eq!(device.writes(), vec![b"hello".to_vec()]);
}

#[tokio::test]
async fn test_write_ack_timeout_leaves_handler_usable() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let handler = open_handler(&device).await;

    device.set_ack_writes(false);
    let err = handler.write_serial(b"first").await.unwrap_err();
    assert!(matches!(err, EbyteError::Timeout(TimeoutKind::WriteAck)));

    device.set_ack_writes(true);
    tokio_test::assert_ok!(handler.write_serial(b"second").await);
    assert_eq!(device.writes(), vec![b"first".to_vec(), b"second".to_vec()]);
}

#[tokio::test]
async fn test_busy_line_timeout_then_recovery() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let handler = open_handler(&device).await;

    device.hold_busy();
    let err = handler.write_serial(b"blocked").await.unwrap_err();
    assert!(matches!(err, EbyteError::Timeout(TimeoutKind::BusyFree)));
    assert!(device.writes().is_empty());

    let (result, ()) = tokio::join!(handler.write_serial(b"later"), async {
        sleep(Duration::from_millis(50)).await;
        assert!(device.writes().is_empty());
        device.release_busy();
    });
    tokio_test::assert_ok!(result);
    assert_eq!(device.writes(), vec![b"later".to_vec()]);
}

#[tokio::test]
async fn test_concurrent_writes_are_serialized() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let handler = open_handler(&device).await;

    let (a, b) = tokio::join!(handler.write_serial(b"one"), handler.write_serial(b"two"));
    tokio_test::assert_ok!(a);
    tokio_test::assert_ok!(b);

    let mut writes = device.writes();
    writes.sort();
    assert_eq!(writes, vec![b"one".to_vec(), b"two".to_vec()]);
}

#[tokio::test]
async fn test_write_transport_error_is_returned() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let handler = open_handler(&device).await;

    device.fail_next_write("cable unplugged");
    let err = handler.write_serial(b"lost").await.unwrap_err();
    assert!(matches!(err, EbyteError::Transport(ref msg) if msg == "cable unplugged"));

    tokio_test::assert_ok!(handler.write_serial(b"kept").await);
    assert_eq!(device.writes(), vec![b"kept".to_vec()]);
}

#[tokio::test]
async fn test_set_mode_drives_lines() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;

    for mode in [ChipMode::Normal, ChipMode::WakeUp, ChipMode::PowerSaving, ChipMode::Sleep] {
        handler.set_mode(mode).await.unwrap();
        assert_eq!(device.line_levels(), mode.line_levels());
        assert_eq!(handler.mode().unwrap(), mode);
    }
}

#[tokio::test]
async fn test_set_mode_to_current_mode_is_noop() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;

    device.set_ack_mode_switches(false);
    tokio_test::assert_ok!(handler.set_mode(ChipMode::Sleep).await);
    assert_eq!(device.opened_settings(), vec![SLEEP_SETTINGS]);
}

#[tokio::test]
async fn test_mode_switch_ack_timeout() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;

    device.set_ack_mode_switches(false);
    let err = handler.set_mode(ChipMode::Normal).await.unwrap_err();
    assert!(matches!(err, EbyteError::Timeout(TimeoutKind::ModeSwitchAck)));

    device.set_ack_mode_switches(true);
    tokio_test::assert_ok!(handler.set_mode(ChipMode::WakeUp).await);
    assert_eq!(handler.mode().unwrap(), ChipMode::WakeUp);
}

#[tokio::test]
async fn test_serial_link_reopened_only_on_change() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;
    let operating = SerialSettings::new(115200, Parity::Even);

    handler.set_mode(ChipMode::Normal).await.unwrap();
    assert_eq!(device.opened_settings(), vec![SLEEP_SETTINGS]);

    handler.stage_serial_settings(operating);
    handler.set_mode(ChipMode::Sleep).await.unwrap();
    assert_eq!(device.opened_settings(), vec![SLEEP_SETTINGS]);

    handler.set_mode(ChipMode::Normal).await.unwrap();
    assert_eq!(handler.active_serial_settings().await, operating);

    handler.set_mode(ChipMode::WakeUp).await.unwrap();
    handler.set_mode(ChipMode::Sleep).await.unwrap();
    assert_eq!(
        device.opened_settings(),
        vec![SLEEP_SETTINGS, operating, SLEEP_SETTINGS]
    );
    assert_eq!(handler.staged_serial_settings(), operating);
}

#[tokio::test]
async fn test_undefined_line_levels() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;

    device.set_line_levels(2, 0);
    assert!(matches!(
        handler.mode(),
        Err(EbyteError::UndefinedMode { m0: 2, m1: 0 })
    ));
    assert!(handler.set_mode(ChipMode::Normal).await.is_err());
}

#[tokio::test]
async fn test_second_callback_rejected() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;

    tokio_test::assert_ok!(handler.register_message_callback(Box::new(|_| {})));
    assert!(matches!(
        handler.register_message_callback(Box::new(|_| {})),
        Err(EbyteError::DuplicateCallback)
    ));
}

#[tokio::test]
async fn test_unsolicited_message_reaches_callback() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let handler = open_handler(&device).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    handler
        .register_message_callback(Box::new(move |raw| {
            let _ = tx.send(raw);
        }))
        .unwrap();

    device.inject_message(b"hello");
    let raw = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw.unwrap(), b"hello");

    // An edge with nothing to read is the idle link, not a message
    device.emit_edge();
    sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_read_serial_returns_exact_bytes() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;

    device.queue_rx_data(&[0xC1, 0x00, 0x01, 0x12]);
    assert_eq!(handler.read_serial().await.unwrap(), vec![0xC1, 0x00, 0x01, 0x12]);
    assert!(matches!(handler.read_serial().await, Err(EbyteError::EndOfStream)));
}

#[tokio::test]
async fn test_read_times_out_when_module_silent() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;
    device.set_pend_reads(true);

    let err = handler.read_serial().await.unwrap_err();
    assert!(matches!(err, EbyteError::Timeout(TimeoutKind::Read)));
    assert!(err.is_idle());

    device.queue_rx_data(b"ok");
    assert_eq!(handler.read_serial().await.unwrap(), b"ok");
}

#[tokio::test]
async fn test_background_read_timeout_is_idle() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let timing = Timing {
        read_timeout: Duration::from_millis(100),
        ..fast_timing()
    };
    let handler = open_handler_with_timing(&device, timing).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    handler
        .register_message_callback(Box::new(move |raw| {
            let _ = tx.send(raw);
        }))
        .unwrap();

    device.set_pend_reads(true);
    device.emit_edge();
    sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());

    device.inject_message(b"late");
    let raw = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw.unwrap(), b"late");
}

#[tokio::test]
async fn test_read_proceeds_while_write_waits_on_busy_line() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let handler = open_handler(&device).await;

    device.hold_busy();
    let writer = handler.clone();
    let write = tokio::spawn(async move { writer.write_serial(b"queued").await });
    sleep(Duration::from_millis(20)).await;

    device.queue_rx_data(b"inbound");
    let read = tokio::time::timeout(Duration::from_millis(100), handler.read_serial()).await;
    assert_eq!(read.unwrap().unwrap(), b"inbound");
    assert!(!write.is_finished());
    assert!(device.writes().is_empty());

    device.release_busy();
    tokio_test::assert_ok!(write.await.unwrap());
    assert_eq!(device.writes(), vec![b"queued".to_vec()]);
}

#[tokio::test]
async fn test_write_not_delayed_by_pending_background_read() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let timing = Timing {
        read_timeout: Duration::from_millis(1500),
        ..fast_timing()
    };
    let handler = open_handler_with_timing(&device, timing).await;

    // Edge with nothing to read: the background read waits on the link
    device.set_pend_reads(true);
    device.emit_edge();
    sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    tokio_test::assert_ok!(handler.write_serial(b"ping").await);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(device.writes(), vec![b"ping".to_vec()]);
}

#[tokio::test]
async fn test_write_not_delayed_by_pending_read_serial() {
    let device = MockDevice::new();
    device.set_line_levels(0, 0);
    let timing = Timing {
        read_timeout: Duration::from_millis(1500),
        ..fast_timing()
    };
    let handler = open_handler_with_timing(&device, timing).await;

    device.set_pend_reads(true);
    let reader = handler.clone();
    let read = tokio::spawn(async move { reader.read_serial().await });
    sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    tokio_test::assert_ok!(handler.write_serial(b"ping").await);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(!read.is_finished());

    device.queue_rx_data(b"pong");
    assert_eq!(read.await.unwrap().unwrap(), b"pong");
}

#[tokio::test]
async fn test_close_releases_hardware() {
    let device = MockDevice::new();
    let handler = open_handler(&device).await;

    tokio_test::assert_ok!(handler.close().await);
    assert!(device.is_released());
    assert!(device.is_closed());
}
