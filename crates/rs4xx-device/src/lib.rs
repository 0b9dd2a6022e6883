//! Capability negotiation and device construction for RS4xx cameras.
//!
//! The entry point is [`Camera::new`], which takes an enumerated device
//! group plus a hardware command channel and performs the full ordered
//! registration sequence: depth endpoint first, then the fisheye/motion
//! or color endpoints the SKU calls for, gating every optional control
//! on the product id and firmware version reported by the device.

pub mod auto_exposure;
pub mod camera;
pub mod capability;
pub mod endpoint;
pub mod roi;

pub use auto_exposure::{AutoExposureMechanism, AutoExposureMode, AutoExposureState};
pub use camera::{Camera, DeviceError, MotionSensor};
pub use capability::{CapabilityProfile, Feature};
pub use endpoint::{
    ControlSpec, DeviceGroup, EndpointFactory, ExtensionUnit, HidInterface, InfoRegistry,
    OptionId, PixelFormat, PoseFn, SensorEndpoint, SubInterface,
};
pub use roi::{AutoExposureRoiMethod, HwRoiMethod, RoiMethod};
