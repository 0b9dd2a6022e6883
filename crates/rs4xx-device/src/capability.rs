//! Firmware- and SKU-gated feature negotiation.
//!
//! Every optional control the constructor may register is guarded by an
//! entry in [`FEATURE_GATES`]: a minimum firmware version (inclusive)
//! and, for some features, an allow-list of product ids. Evaluating the
//! table once up front keeps the construction sequence free of ad-hoc
//! version comparisons.

use std::collections::HashSet;

use rs4xx_core::{product, FirmwareVersion, ProductId};

/// Optional capabilities a device may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Extended depth exposure/gain controls and the camera-locked query.
    ExtendedDepthControls,
    /// Auto white balance toggle on the depth imager.
    AutoWhiteBalance,
    /// External trigger output control.
    TriggerOutput,
    /// Background polling of the hardware fault register.
    ErrorPolling,
    AsicTemperature,
    ProjectorTemperature,
    /// Motion module firmware version is present in the GVD block.
    MotionModuleFwVersion,
    /// Custom HID profiles: raw GPIO stream and motion module temperature.
    CustomHidProfiles,
    /// Host-side auto exposure for the fisheye imager.
    FisheyeAutoExposure,
}

const FW_EXTENDED_CONTROLS: FirmwareVersion = FirmwareVersion {
    major: 5,
    minor: 6,
    patch: 3,
    build: 0,
};

const FW_TELEMETRY: FirmwareVersion = FirmwareVersion {
    major: 5,
    minor: 5,
    patch: 8,
    build: 0,
};

const FW_CUSTOM_HID: FirmwareVersion = FirmwareVersion {
    major: 5,
    minor: 6,
    patch: 0,
    build: 0,
};

/// SKUs with a laser projector.
pub const LASER_SKUS: &[ProductId] = &[
    product::RS410,
    product::RS430,
    product::RS430_MM,
    product::RS430_MM_RGB,
    product::RS435_RGB,
];

/// SKUs with a fisheye imager and motion module.
pub const FISHEYE_SKUS: &[ProductId] = &[product::RS430_MM, product::RS420_MM];

/// SKUs with a dedicated color imager.
pub const COLOR_SKUS: &[ProductId] = &[product::RS415, product::RS430_MM_RGB, product::RS435_RGB];

const AWB_SKUS: &[ProductId] = &[
    product::RS400,
    product::RS400_MM,
    product::RS410,
    product::RS410_MM,
    product::RS415,
];

const PROJECTOR_TEMP_SKUS: &[ProductId] = &[product::RS410, product::RS430, product::RS430_MM];

/// One row of the gating table.
pub struct FeatureGate {
    pub feature: Feature,
    pub min_firmware: FirmwareVersion,
    /// When set, the feature additionally requires one of these SKUs.
    pub products: Option<&'static [ProductId]>,
}

pub const FEATURE_GATES: &[FeatureGate] = &[
    FeatureGate {
        feature: Feature::ExtendedDepthControls,
        min_firmware: FW_EXTENDED_CONTROLS,
        products: None,
    },
    FeatureGate {
        feature: Feature::AutoWhiteBalance,
        min_firmware: FW_EXTENDED_CONTROLS,
        products: Some(AWB_SKUS),
    },
    FeatureGate {
        feature: Feature::TriggerOutput,
        min_firmware: FW_TELEMETRY,
        products: None,
    },
    FeatureGate {
        feature: Feature::ErrorPolling,
        min_firmware: FW_TELEMETRY,
        products: None,
    },
    FeatureGate {
        feature: Feature::AsicTemperature,
        min_firmware: FW_TELEMETRY,
        products: None,
    },
    FeatureGate {
        feature: Feature::ProjectorTemperature,
        min_firmware: FW_TELEMETRY,
        products: Some(PROJECTOR_TEMP_SKUS),
    },
    FeatureGate {
        feature: Feature::MotionModuleFwVersion,
        min_firmware: FW_TELEMETRY,
        products: Some(FISHEYE_SKUS),
    },
    FeatureGate {
        feature: Feature::CustomHidProfiles,
        min_firmware: FW_CUSTOM_HID,
        products: None,
    },
    FeatureGate {
        feature: Feature::FisheyeAutoExposure,
        min_firmware: FW_EXTENDED_CONTROLS,
        products: None,
    },
];

/// Features enabled for one concrete device.
#[derive(Debug, Clone)]
pub struct CapabilityProfile {
    enabled: HashSet<Feature>,
}

impl CapabilityProfile {
    /// Evaluates the gating table against a device's identity.
    pub fn evaluate(product_id: ProductId, firmware: FirmwareVersion) -> Self {
        let enabled = FEATURE_GATES
            .iter()
            .filter(|gate| firmware >= gate.min_firmware)
            .filter(|gate| gate.products.is_none_or(|skus| skus.contains(&product_id)))
            .map(|gate| gate.feature)
            .collect();
        Self { enabled }
    }

    pub fn enabled(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }
}

pub fn is_laser_sku(product_id: ProductId) -> bool {
    LASER_SKUS.contains(&product_id)
}

pub fn is_fisheye_sku(product_id: ProductId) -> bool {
    FISHEYE_SKUS.contains(&product_id)
}

pub fn is_color_sku(product_id: ProductId) -> bool {
    COLOR_SKUS.contains(&product_id)
}
