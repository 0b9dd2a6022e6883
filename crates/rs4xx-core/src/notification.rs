//! Hardware fault-code decoding
//!
//! The error-polling control reports a raw integer code; `decode_hw_error`
//! maps every possible code to a structured notification. The mapping is
//! total: unknown codes become "Unknown error!" at severity `None`.

use serde::{Deserialize, Serialize};

/// Known fault codes reported by the error-polling control.
pub mod fault_code {
    pub const SUCCESS: i32 = 0;
    pub const HOT_LASER_POWER_REDUCE: i32 = 1;
    pub const HOT_LASER_DISABLE: i32 = 2;
    pub const FLAG_B_LASER_DISABLE: i32 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// The only category this subsystem emits.
    HardwareError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    None,
    Error,
}

/// Structured representation of one raw hardware fault code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub category: NotificationCategory,
    pub raw_code: i32,
    pub severity: NotificationSeverity,
    pub message: String,
}

impl Notification {
    fn hw_error(raw_code: i32, severity: NotificationSeverity, message: &str) -> Self {
        Self {
            category: NotificationCategory::HardwareError,
            raw_code,
            severity,
            message: message.to_string(),
        }
    }
}

/// Decode a raw fault code into a notification. Total over all integers.
///
/// Code 0 ("Success") is reported as a hardware-error record at error
/// severity. Downstream listeners depend on seeing it, so it is kept that
/// way even though it reads oddly.
pub fn decode_hw_error(raw_code: i32) -> Notification {
    use NotificationSeverity::*;
    match raw_code {
        fault_code::SUCCESS => Notification::hw_error(raw_code, Error, "Success"),
        fault_code::HOT_LASER_POWER_REDUCE => {
            Notification::hw_error(raw_code, Error, "Hot laser power reduce")
        }
        fault_code::HOT_LASER_DISABLE => {
            Notification::hw_error(raw_code, Error, "Hot laser disable")
        }
        fault_code::FLAG_B_LASER_DISABLE => {
            Notification::hw_error(raw_code, Error, "Flag B laser disable")
        }
        _ => Notification::hw_error(raw_code, None, "Unknown error!"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_code_is_error_severity() {
        let n = decode_hw_error(0);
        assert_eq!(n.category, NotificationCategory::HardwareError);
        assert_eq!(n.severity, NotificationSeverity::Error);
        assert_eq!(n.message, "Success");
        assert_eq!(n.raw_code, 0);
    }

    #[test]
    fn test_known_fault_codes() {
        assert_eq!(decode_hw_error(1).message, "Hot laser power reduce");
        assert_eq!(decode_hw_error(2).message, "Hot laser disable");
        assert_eq!(decode_hw_error(3).message, "Flag B laser disable");
        for code in 1..=3 {
            assert_eq!(decode_hw_error(code).severity, NotificationSeverity::Error);
        }
    }

    #[test]
    fn test_unknown_code_is_severity_none() {
        let n = decode_hw_error(9999);
        assert_eq!(n.severity, NotificationSeverity::None);
        assert_eq!(n.message, "Unknown error!");
        assert_eq!(n.raw_code, 9999);

        let negative = decode_hw_error(-1);
        assert_eq!(negative.severity, NotificationSeverity::None);
    }
}
