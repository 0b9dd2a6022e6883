//! Camera and motion-module intrinsics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionModel {
    None,
    BrownConrady,
    Fisheye,
}

/// Per-resolution optical parameters of a single sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    /// Principal point, pixels.
    pub ppx: f32,
    pub ppy: f32,
    /// Focal length, pixels.
    pub fx: f32,
    pub fy: f32,
    pub model: DistortionModel,
    pub coeffs: [f32; 5],
}

/// Motion sensor (accel/gyro) calibration: a 3x4 matrix combining scale,
/// cross-axis terms and bias, one row per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionIntrinsics {
    pub data: [[f32; 4]; 3],
}
