//! Auto-exposure metering region

use serde::{Deserialize, Serialize};

/// Region of interest in sensor pixel coordinates.
///
/// Field order matches the hardware command encoding; no min/max ordering
/// is enforced here, the receiver is free to compare them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub min_x: u16,
    pub min_y: u16,
    pub max_x: u16,
    pub max_y: u16,
}

impl RegionOfInterest {
    pub const fn new(min_x: u16, min_y: u16, max_x: u16, max_y: u16) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}
