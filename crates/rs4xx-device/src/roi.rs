//! Auto exposure region-of-interest backends.
//!
//! The depth imager's metering region lives in firmware and is set over
//! the hardware monitor; the fisheye imager's region is consumed by the
//! host-side auto exposure loop. Both sit behind [`RoiMethod`] so an
//! endpoint does not care which one it carries.

use std::sync::{Arc, Mutex};

use tracing::debug;

use rs4xx_core::RegionOfInterest;
use rs4xx_hwmon::{opcode, Command, HwMonitor, HwMonitorError};

use crate::auto_exposure::AutoExposureMechanism;

pub trait RoiMethod: Send + Sync {
    fn set(&self, roi: RegionOfInterest) -> Result<(), HwMonitorError>;
    fn get(&self) -> Result<RegionOfInterest, HwMonitorError>;
}

/// Firmware-backed metering region of the depth auto exposure.
pub struct HwRoiMethod {
    monitor: HwMonitor,
}

impl HwRoiMethod {
    pub fn new(monitor: HwMonitor) -> Self {
        Self { monitor }
    }
}

const ROI_RESPONSE_LEN: usize = 8;

impl RoiMethod for HwRoiMethod {
    fn set(&self, roi: RegionOfInterest) -> Result<(), HwMonitorError> {
        debug!(?roi, "setting hardware auto exposure region");
        let command = Command {
            param3: roi.min_x as u32,
            param4: roi.max_x as u32,
            ..Command::with_params(opcode::SETAEROI, roi.min_y as u32, roi.max_y as u32)
        };
        self.monitor.send(&command)?;
        Ok(())
    }

    fn get(&self) -> Result<RegionOfInterest, HwMonitorError> {
        let response = self.monitor.send(&Command::new(opcode::GETAEROI))?;
        if response.len() < ROI_RESPONSE_LEN {
            return Err(HwMonitorError::ShortResponse {
                expected: ROI_RESPONSE_LEN,
                actual: response.len(),
            });
        }
        let word = |i: usize| u16::from_le_bytes([response[i * 2], response[i * 2 + 1]]);
        Ok(RegionOfInterest {
            min_y: word(0),
            max_y: word(1),
            min_x: word(2),
            max_x: word(3),
        })
    }
}

/// Metering region of the host-side fisheye auto exposure. The region
/// only exists on the host, so reads return the last value written.
pub struct AutoExposureRoiMethod {
    mechanism: Arc<AutoExposureMechanism>,
    cached: Mutex<RegionOfInterest>,
}

impl AutoExposureRoiMethod {
    pub fn new(mechanism: Arc<AutoExposureMechanism>) -> Self {
        Self {
            mechanism,
            cached: Mutex::new(RegionOfInterest::default()),
        }
    }
}

impl RoiMethod for AutoExposureRoiMethod {
    fn set(&self, roi: RegionOfInterest) -> Result<(), HwMonitorError> {
        self.mechanism.update_roi(roi);
        *self.cached.lock().unwrap_or_else(|e| e.into_inner()) = roi;
        Ok(())
    }

    fn get(&self) -> Result<RegionOfInterest, HwMonitorError> {
        Ok(*self.cached.lock().unwrap_or_else(|e| e.into_inner()))
    }
}
