//! Descriptive info keys registered per logical sub-device

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keys of the per-endpoint descriptive info map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraInfo {
    DeviceName,
    ModuleName,
    SerialNumber,
    FirmwareVersion,
    DeviceLocation,
    DebugOpCode,
    AdvancedMode,
    ProductId,
    CameraLocked,
    MotionModuleFirmwareVersion,
}

/// Descriptive key/value pairs for one logical sub-device.
pub type CameraInfoMap = HashMap<CameraInfo, String>;
