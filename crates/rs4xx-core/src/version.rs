//! Firmware version parsing and comparison
//!
//! RS4xx firmware reports a four-field `major.minor.patch.build` version.
//! All capability gates compare versions field by field, so the derived
//! lexicographic ordering on the struct fields is the comparison semantics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("expected four dot-separated fields, got {0}")]
    FieldCount(usize),
    #[error("invalid version field {field:?}: {reason}")]
    Field { field: String, reason: String },
}

/// Firmware version as reported by the general version/device table.
///
/// Field order matters: `Ord` is derived, so comparison is lexicographic
/// over `(major, minor, patch, build)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub build: u8,
}

impl FirmwareVersion {
    pub const fn new(major: u8, minor: u8, patch: u8, build: u8) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Build a version from the raw 4-byte field of the version table.
    ///
    /// The hardware stores the components least-significant first, so the
    /// rendered version reads the bytes in reverse.
    pub fn from_table_bytes(bytes: [u8; 4]) -> Self {
        Self {
            major: bytes[3],
            minor: bytes[2],
            patch: bytes[1],
            build: bytes[0],
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl FromStr for FirmwareVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split('.').collect();
        if fields.len() != 4 {
            return Err(VersionParseError::FieldCount(fields.len()));
        }
        let mut parsed = [0u8; 4];
        for (slot, field) in parsed.iter_mut().zip(&fields) {
            *slot = field.parse().map_err(|e| VersionParseError::Field {
                field: field.to_string(),
                reason: format!("{e}"),
            })?;
        }
        Ok(Self::new(parsed[0], parsed[1], parsed[2], parsed[3]))
    }
}
