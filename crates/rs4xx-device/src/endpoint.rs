//! External seams of the driver core.
//!
//! Everything here is declarative: endpoints receive *descriptions* of
//! controls, formats and metadata parsers, and the host integration
//! decides how to surface them. The construction sequence in
//! [`crate::camera`] only ever talks to these traits, so it can be
//! exercised end to end against mocks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rs4xx_core::{CameraInfoMap, MetadataField, MetadataParser, Pose, ProductId};
use rs4xx_hwmon::HwMonitorError;

use crate::roi::RoiMethod;

/// Lazily evaluated pose query attached to an endpoint. Evaluation may
/// hit the hardware monitor, so it can fail.
pub type PoseFn = Arc<dyn Fn() -> Result<Pose, HwMonitorError> + Send + Sync>;

/// Addressing triple for a vendor extension unit on a video node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionUnit {
    pub subdevice: u8,
    pub unit: u8,
    pub node: u8,
}

/// Extension unit carried by the depth video node.
pub const DEPTH_XU: ExtensionUnit = ExtensionUnit {
    subdevice: 0,
    unit: 3,
    node: 2,
};

/// Extension unit carried by the fisheye video node.
pub const FISHEYE_XU: ExtensionUnit = ExtensionUnit {
    subdevice: 3,
    unit: 12,
    node: 9,
};

/// Control selectors within [`DEPTH_XU`].
pub mod depth_ctrl {
    pub const HWMONITOR: u8 = 1;
    pub const EMITTER_ENABLED: u8 = 2;
    pub const EXPOSURE: u8 = 3;
    pub const LASER_POWER: u8 = 4;
    pub const ERROR_REPORTING: u8 = 7;
    pub const EXT_TRIGGER: u8 = 10;
    pub const ENABLE_AUTO_WHITE_BALANCE: u8 = 0x0A;
    pub const ENABLE_AUTO_EXPOSURE: u8 = 0x0B;
}

/// Control selectors within [`FISHEYE_XU`].
pub mod fisheye_ctrl {
    pub const EXPOSURE: u8 = 1;
}

/// Identifiers for the options an endpoint can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionId {
    Gain,
    Exposure,
    EnableAutoExposure,
    EnableAutoWhiteBalance,
    LaserPower,
    EmitterEnabled,
    OutputTriggerEnabled,
    ErrorPollingEnabled,
    AsicTemperature,
    ProjectorTemperature,
    MotionModuleTemperature,
    DepthUnits,
    AutoExposureMode,
    AutoExposureAntiflickerRate,
    EnableMotionCorrection,
    // Standard processing-unit controls of the color endpoint.
    BacklightCompensation,
    Brightness,
    Contrast,
    Gamma,
    Hue,
    Saturation,
    Sharpness,
    WhiteBalance,
}

/// Pixel formats an endpoint can stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Z16,
    Y8,
    Y8i,
    Y12i,
    Yuyv,
    Uyvy,
    Rgb8,
    Yuy2,
    Bayer16,
    Raw8,
    Raw8UnpatchedKernel,
    AccelAxes,
    GyroAxes,
    GpioRaw,
}

/// Declarative description of how an option is backed.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlSpec {
    /// Standard processing-unit control owned by the video node itself.
    Pu(OptionId),
    XuU8 {
        xu: ExtensionUnit,
        control: u8,
        description: &'static str,
    },
    XuU16 {
        xu: ExtensionUnit,
        control: u8,
        description: &'static str,
    },
    XuU32 {
        xu: ExtensionUnit,
        control: u8,
        description: &'static str,
    },
    /// Read-only while `switch` is enabled; writes first turn the switch off.
    AutoDisabling {
        inner: Box<ControlSpec>,
        switch: OptionId,
    },
    /// Fixed read-only value.
    ConstValue {
        description: &'static str,
        value: f32,
    },
    /// Depth unit scale read from the device, available in advanced mode.
    HardwareDepthScale,
    /// Read-only temperature telemetry.
    TemperatureTelemetry { description: &'static str },
    /// Toggle that starts or stops polling `source` for hardware faults.
    ErrorPolling { source: Box<ControlSpec> },
    /// Toggle of the host-side auto exposure mechanism.
    AutoExposureEnable,
    /// Enumerated choice, exposed with per-value labels.
    Selector {
        description: &'static str,
        choices: &'static [(f32, &'static str)],
        default: f32,
    },
    /// Toggle of host-side motion sample correction.
    MotionCorrection,
}

/// One streaming endpoint of the camera. Implemented by the host
/// integration; the constructor only registers capabilities on it.
pub trait SensorEndpoint: Send {
    fn register_option(&mut self, id: OptionId, control: ControlSpec);

    fn register_pu(&mut self, id: OptionId) {
        self.register_option(id, ControlSpec::Pu(id));
    }

    fn register_xu(&mut self, xu: ExtensionUnit);

    fn register_pixel_format(&mut self, format: PixelFormat);

    fn register_metadata(&mut self, field: MetadataField, parser: MetadataParser);

    fn set_roi_method(&mut self, method: Box<dyn RoiMethod>);

    fn set_pose(&mut self, pose: PoseFn);
}

/// One USB video sub-interface of an enumerated device group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubInterface {
    /// Interface index within the composite device. Depth is 0, the
    /// secondary imager (fisheye or color) is 3.
    pub index: u8,
    pub device_path: String,
}

/// HID interface of the motion module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidInterface {
    pub device_path: String,
}

/// Everything enumeration discovered about one physical camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroup {
    pub product_id: ProductId,
    pub video: Vec<SubInterface>,
    pub hid: Vec<HidInterface>,
}

impl DeviceGroup {
    /// Video sub-interfaces with the given index.
    pub fn video_with_index(&self, index: u8) -> Vec<&SubInterface> {
        self.video.iter().filter(|i| i.index == index).collect()
    }
}

/// Creates concrete endpoints for the platform the driver runs on.
pub trait EndpointFactory {
    fn create_video_endpoint(
        &self,
        interface: &SubInterface,
    ) -> anyhow::Result<Box<dyn SensorEndpoint>>;

    fn create_motion_endpoint(
        &self,
        interface: &HidInterface,
    ) -> anyhow::Result<Box<dyn SensorEndpoint>>;
}

/// Sink for per-endpoint informational string maps.
pub trait InfoRegistry {
    fn register_endpoint_info(&mut self, endpoint_index: usize, info: CameraInfoMap);
}
