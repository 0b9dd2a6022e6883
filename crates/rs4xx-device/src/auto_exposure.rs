//! Host-side auto exposure for the fisheye imager.
//!
//! The fisheye sensor has no auto exposure in firmware, so the driver
//! runs the loop on the host. This module holds the shared mechanism
//! state and the option wiring that hands control of gain and exposure
//! over to it.

use std::sync::{Arc, Mutex};

use rs4xx_core::RegionOfInterest;

use crate::endpoint::{fisheye_ctrl, ControlSpec, ExtensionUnit, OptionId, SensorEndpoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoExposureMode {
    Static,
    AntiFlicker,
    Hybrid,
}

/// Snapshot of the mechanism's tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoExposureState {
    pub is_auto_exposure: bool,
    pub mode: AutoExposureMode,
    pub antiflicker_rate: u32,
    pub metering_roi: RegionOfInterest,
}

impl Default for AutoExposureState {
    fn default() -> Self {
        Self {
            is_auto_exposure: true,
            mode: AutoExposureMode::Static,
            antiflicker_rate: 60,
            metering_roi: RegionOfInterest::default(),
        }
    }
}

/// Shared state of the host-side auto exposure loop.
pub struct AutoExposureMechanism {
    state: Mutex<AutoExposureState>,
}

impl AutoExposureMechanism {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AutoExposureState::default()),
        }
    }

    /// Restricts metering to the given region of the frame.
    pub fn update_roi(&self, roi: RegionOfInterest) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).metering_roi = roi;
    }

    pub fn state(&self) -> AutoExposureState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AutoExposureMechanism {
    fn default() -> Self {
        Self::new()
    }
}

const AE_MODE_CHOICES: &[(f32, &str)] = &[
    (0.0, "Static"),
    (1.0, "Anti-Flicker"),
    (2.0, "Hybrid"),
];

const ANTIFLICKER_RATE_CHOICES: &[(f32, &str)] = &[(50.0, "50Hz"), (60.0, "60Hz")];

/// Registers the fisheye auto exposure option set on an endpoint and
/// returns the mechanism the ROI controller should feed.
pub fn register_auto_exposure_options(
    endpoint: &mut dyn SensorEndpoint,
    xu: &ExtensionUnit,
) -> Arc<AutoExposureMechanism> {
    let mechanism = Arc::new(AutoExposureMechanism::new());

    endpoint.register_option(OptionId::EnableAutoExposure, ControlSpec::AutoExposureEnable);
    endpoint.register_option(
        OptionId::AutoExposureMode,
        ControlSpec::Selector {
            description: "Auto exposure mode",
            choices: AE_MODE_CHOICES,
            default: 0.0,
        },
    );
    endpoint.register_option(
        OptionId::AutoExposureAntiflickerRate,
        ControlSpec::Selector {
            description: "Auto exposure anti-flicker rate",
            choices: ANTIFLICKER_RATE_CHOICES,
            default: 60.0,
        },
    );
    endpoint.register_option(
        OptionId::Gain,
        ControlSpec::AutoDisabling {
            inner: Box::new(ControlSpec::Pu(OptionId::Gain)),
            switch: OptionId::EnableAutoExposure,
        },
    );
    endpoint.register_option(
        OptionId::Exposure,
        ControlSpec::AutoDisabling {
            inner: Box::new(ControlSpec::XuU16 {
                xu: *xu,
                control: fisheye_ctrl::EXPOSURE,
                description: "Exposure time of the fisheye imager",
            }),
            switch: OptionId::EnableAutoExposure,
        },
    );

    mechanism
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_update_is_visible_in_state() {
        let mechanism = AutoExposureMechanism::new();
        assert_eq!(
            mechanism.state().metering_roi,
            RegionOfInterest::default()
        );

        let roi = RegionOfInterest {
            min_x: 4,
            min_y: 8,
            max_x: 100,
            max_y: 60,
        };
        mechanism.update_roi(roi);
        assert_eq!(mechanism.state().metering_roi, roi);
        assert!(mechanism.state().is_auto_exposure);
    }
}
