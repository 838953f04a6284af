//! Chip operating modes and their M0/M1 encoding.

use crate::error::EbyteError;
use crate::hal::{LINE_HIGH, LINE_LOW};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating modes selected by the M0/M1 lines
///
/// ```text
/// Mode         │ M0 │ M1
/// ─────────────┼────┼────
/// Normal       │ 0  │ 0
/// WakeUp       │ 1  │ 0
/// PowerSaving  │ 0  │ 1
/// Sleep        │ 1  │ 1
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChipMode {
    /// UART and radio open, transparent transmission
    Normal,
    /// Like Normal, but a wake-up preamble is prepended for receivers in power saving
    WakeUp,
    /// UART closed, radio in wake-on-radio listening
    PowerSaving,
    /// Register access; radio off
    Sleep,
}

impl ChipMode {
    pub const ALL: [ChipMode; 4] = [
        ChipMode::Normal,
        ChipMode::WakeUp,
        ChipMode::PowerSaving,
        ChipMode::Sleep,
    ];

    /// (M0, M1) output values for this mode
    pub const fn line_levels(self) -> (u8, u8) {
        match self {
            ChipMode::Normal => (LINE_LOW, LINE_LOW),
            ChipMode::WakeUp => (LINE_HIGH, LINE_LOW),
            ChipMode::PowerSaving => (LINE_LOW, LINE_HIGH),
            ChipMode::Sleep => (LINE_HIGH, LINE_HIGH),
        }
    }

    /// Decode live M0/M1 values.
    pub fn from_line_levels(m0: u8, m1: u8) -> Result<Self, EbyteError> {
        ChipMode::ALL
            .into_iter()
            .find(|mode| mode.line_levels() == (m0, m1))
            .ok_or(EbyteError::UndefinedMode { m0, m1 })
    }

    /// Whether the module accepts payload bytes for transmission in this mode.
    pub const fn can_transmit(self) -> bool {
        matches!(self, ChipMode::Normal | ChipMode::WakeUp)
    }
}

impl fmt::Display for ChipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChipMode::Normal => "normal",
            ChipMode::WakeUp => "wake-up",
            ChipMode::PowerSaving => "power-saving",
            ChipMode::Sleep => "sleep",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_levels_round_trip() {
        for mode in ChipMode::ALL {
            let (m0, m1) = mode.line_levels();
            assert_eq!(ChipMode::from_line_levels(m0, m1).unwrap(), mode);
        }
    }

    #[test]
    fn test_undefined_levels() {
        let err = ChipMode::from_line_levels(2, 0).unwrap_err();
        assert!(matches!(err, EbyteError::UndefinedMode { m0: 2, m1: 0 }));
    }

    #[test]
    fn test_can_transmit() {
        assert!(ChipMode::Normal.can_transmit());
        assert!(ChipMode::WakeUp.can_transmit());
        assert!(!ChipMode::PowerSaving.can_transmit());
        assert!(!ChipMode::Sleep.can_transmit());
    }
}
