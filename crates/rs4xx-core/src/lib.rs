//! RS4xx Core - Foundational types for the RS4xx depth camera driver
//!
//! This crate provides the value types shared by the rest of the driver:
//! - Firmware version parsing and field-by-field ordering
//! - Rigid-transform pose algebra for cross-sensor extrinsics
//! - Region-of-interest rectangle for auto-exposure metering
//! - Camera and motion-module intrinsics
//! - Hardware fault-code decoding into structured notifications
//! - Offset-addressed per-frame metadata descriptors and parsers
//! - Camera-info keys and the product-id lookup table

pub mod info;
pub mod intrinsics;
pub mod metadata;
pub mod notification;
pub mod pose;
pub mod product;
pub mod roi;
pub mod version;

pub use info::{CameraInfo, CameraInfoMap};
pub use intrinsics::{CameraIntrinsics, DistortionModel, MotionIntrinsics};
pub use metadata::{AttributeDescriptor, FieldWidth, MetadataField, MetadataMode, MetadataParser};
pub use notification::{decode_hw_error, Notification, NotificationCategory, NotificationSeverity};
pub use pose::{Matrix3, Pose};
pub use product::ProductId;
pub use roi::RegionOfInterest;
pub use version::{FirmwareVersion, VersionParseError};
