//! Calibration table layouts and validation
//!
//! Calibration blobs come straight from firmware and are untrusted input:
//! every table is validated (length, type tag, version, declared size)
//! before a single field is interpreted, and a failed check rejects the
//! whole table rather than yielding a partially-valid view.
//!
//! All fields are little-endian.

use rs4xx_core::intrinsics::{CameraIntrinsics, DistortionModel, MotionIntrinsics};
use rs4xx_core::pose::{Matrix3, Pose};
use serde::{Deserialize, Serialize};

use crate::error::HwMonitorError;

/// Calibration table ids understood by the GETINTCAL command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum CalibrationTableId {
    Coefficients = 25,
    Depth = 31,
    Rgb = 32,
    Fisheye = 33,
    Imu = 34,
}

/// Common 16-byte header preceding every calibration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHeader {
    pub version: u16,
    pub table_type: u16,
    pub table_size: u32,
    pub param: u32,
    /// Carried for out-of-band verification; not checked here.
    pub crc32: u32,
}

pub const TABLE_HEADER_SIZE: usize = 16;

/// Resolutions carried by the coefficients table's rect-params block, in
/// storage order. The index of a `(width, height)` pair is the index of
/// its `[fx, fy, ppx, ppy]` entry.
pub const RECT_RESOLUTIONS: [(u32, u32); 10] = [
    (424, 240),
    (480, 270),
    (640, 360),
    (640, 400),
    (640, 480),
    (848, 480),
    (960, 540),
    (1280, 720),
    (1280, 800),
    (1920, 1080),
];

// Coefficients table body: four 3x3 f32 matrices (left/right intrinsics
// and world rotations), baseline, model tag, reserved block, then the
// rect-params entries.
pub const COEFFICIENTS_TABLE_TYPE: u16 = CalibrationTableId::Coefficients as u16;
pub const COEFFICIENTS_VERSION_MAJOR: u8 = 2;
pub const COEFFICIENTS_BASELINE_OFFSET: usize = TABLE_HEADER_SIZE + 4 * 36;
pub const COEFFICIENTS_RECT_PARAMS_OFFSET: usize = COEFFICIENTS_BASELINE_OFFSET + 4 + 4 + 88;
pub const COEFFICIENTS_TABLE_MIN_SIZE: usize =
    COEFFICIENTS_RECT_PARAMS_OFFSET + RECT_RESOLUTIONS.len() * 16;

pub const FISHEYE_INTRINSICS_TABLE_TYPE: u16 = CalibrationTableId::Fisheye as u16;
pub const FISHEYE_INTRINSICS_VERSION_MAJOR: u8 = 1;
pub const FISHEYE_INTRINSICS_TABLE_MIN_SIZE: usize = TABLE_HEADER_SIZE + 4 + 16 + 20;

pub const FISHEYE_EXTRINSICS_TABLE_TYPE: u16 = 26;
pub const FISHEYE_EXTRINSICS_VERSION_MAJOR: u8 = 1;
pub const FISHEYE_EXTRINSICS_TABLE_MIN_SIZE: usize = TABLE_HEADER_SIZE + 36 + 12;

pub const IMU_TABLE_TYPE: u16 = CalibrationTableId::Imu as u16;
pub const IMU_VERSION_MAJOR: u8 = 1;
pub const IMU_TABLE_MIN_SIZE: usize = TABLE_HEADER_SIZE + 36 + 12 + 48 + 48;

fn u16_at(raw: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([raw[at], raw[at + 1]])
}

fn u32_at(raw: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

fn f32_at(raw: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

/// Validate a raw blob against the expected schema of one table, returning
/// its parsed header. Nothing past the header may be read before this
/// passes.
fn validate(
    raw: &[u8],
    name: &'static str,
    expected_type: u16,
    expected_major: u8,
    min_size: usize,
) -> Result<TableHeader, HwMonitorError> {
    if raw.len() < TABLE_HEADER_SIZE {
        return Err(HwMonitorError::ShortResponse {
            expected: TABLE_HEADER_SIZE,
            actual: raw.len(),
        });
    }
    let header = TableHeader {
        version: u16_at(raw, 0),
        table_type: u16_at(raw, 2),
        table_size: u32_at(raw, 4),
        param: u32_at(raw, 8),
        crc32: u32_at(raw, 12),
    };
    if header.table_type != expected_type {
        return Err(HwMonitorError::TableFormat {
            table: name,
            reason: format!(
                "type tag {} does not match expected {expected_type}",
                header.table_type
            ),
        });
    }
    let major = (header.version >> 8) as u8;
    if major != expected_major {
        return Err(HwMonitorError::TableFormat {
            table: name,
            reason: format!("version {:#06x} is not a v{expected_major} table", header.version),
        });
    }
    if raw.len() < min_size {
        return Err(HwMonitorError::TableFormat {
            table: name,
            reason: format!("truncated body: {} bytes, expected at least {min_size}", raw.len()),
        });
    }
    if TABLE_HEADER_SIZE + header.table_size as usize > raw.len() {
        return Err(HwMonitorError::TableFormat {
            table: name,
            reason: format!(
                "declared size {} exceeds the {} bytes returned",
                header.table_size,
                raw.len()
            ),
        });
    }
    Ok(header)
}

/// Depth (stereo) coefficients table: the stereo baseline and the
/// per-resolution rectified intrinsics entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientsTable {
    pub header: TableHeader,
    /// Stereo baseline, millimeters; sign convention handled by the caller.
    pub baseline: f32,
    /// `[fx, fy, ppx, ppy]` per entry of `RECT_RESOLUTIONS`.
    pub rect_params: [[f32; 4]; RECT_RESOLUTIONS.len()],
}

impl CoefficientsTable {
    pub fn parse(raw: &[u8]) -> Result<Self, HwMonitorError> {
        let header = validate(
            raw,
            "coefficients",
            COEFFICIENTS_TABLE_TYPE,
            COEFFICIENTS_VERSION_MAJOR,
            COEFFICIENTS_TABLE_MIN_SIZE,
        )?;
        let mut rect_params = [[0.0f32; 4]; RECT_RESOLUTIONS.len()];
        for (i, entry) in rect_params.iter_mut().enumerate() {
            let base = COEFFICIENTS_RECT_PARAMS_OFFSET + i * 16;
            for (j, value) in entry.iter_mut().enumerate() {
                *value = f32_at(raw, base + j * 4);
            }
        }
        Ok(Self {
            header,
            baseline: f32_at(raw, COEFFICIENTS_BASELINE_OFFSET),
            rect_params,
        })
    }

    /// Rectified intrinsics for one of the fixed stereo resolutions.
    pub fn intrinsics_at(&self, width: u32, height: u32) -> Result<CameraIntrinsics, HwMonitorError> {
        let index = RECT_RESOLUTIONS
            .iter()
            .position(|&(w, h)| w == width && h == height)
            .ok_or(HwMonitorError::UnsupportedResolution { width, height })?;
        let [fx, fy, ppx, ppy] = self.rect_params[index];
        Ok(CameraIntrinsics {
            width,
            height,
            ppx,
            ppy,
            fx,
            fy,
            model: DistortionModel::BrownConrady,
            coeffs: [0.0; 5],
        })
    }
}

/// Fisheye sensor intrinsics: a single native resolution with a fisheye
/// distortion vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FisheyeIntrinsicsTable {
    pub header: TableHeader,
    pub width: u16,
    pub height: u16,
    pub fx: f32,
    pub fy: f32,
    pub ppx: f32,
    pub ppy: f32,
    pub distortion: [f32; 5],
}

impl FisheyeIntrinsicsTable {
    pub fn parse(raw: &[u8]) -> Result<Self, HwMonitorError> {
        let header = validate(
            raw,
            "fisheye intrinsics",
            FISHEYE_INTRINSICS_TABLE_TYPE,
            FISHEYE_INTRINSICS_VERSION_MAJOR,
            FISHEYE_INTRINSICS_TABLE_MIN_SIZE,
        )?;
        let mut distortion = [0.0f32; 5];
        for (i, value) in distortion.iter_mut().enumerate() {
            *value = f32_at(raw, TABLE_HEADER_SIZE + 20 + i * 4);
        }
        Ok(Self {
            header,
            width: u16_at(raw, TABLE_HEADER_SIZE),
            height: u16_at(raw, TABLE_HEADER_SIZE + 2),
            fx: f32_at(raw, TABLE_HEADER_SIZE + 4),
            fy: f32_at(raw, TABLE_HEADER_SIZE + 8),
            ppx: f32_at(raw, TABLE_HEADER_SIZE + 12),
            ppy: f32_at(raw, TABLE_HEADER_SIZE + 16),
            distortion,
        })
    }

    /// Fisheye intrinsics are calibrated for the native resolution only;
    /// anything else is an error, not a scaled guess.
    pub fn intrinsics_at(&self, width: u32, height: u32) -> Result<CameraIntrinsics, HwMonitorError> {
        if u32::from(self.width) != width || u32::from(self.height) != height {
            return Err(HwMonitorError::UnsupportedResolution { width, height });
        }
        Ok(CameraIntrinsics {
            width,
            height,
            ppx: self.ppx,
            ppy: self.ppy,
            fx: self.fx,
            fy: self.fy,
            model: DistortionModel::Fisheye,
            coeffs: self.distortion,
        })
    }
}

/// Parse the fisheye extrinsics table into the raw calibrated pose
/// (fisheye relative to the reference sensor, as stored).
pub fn parse_fisheye_extrinsics(raw: &[u8]) -> Result<Pose, HwMonitorError> {
    validate(
        raw,
        "fisheye extrinsics",
        FISHEYE_EXTRINSICS_TABLE_TYPE,
        FISHEYE_EXTRINSICS_VERSION_MAJOR,
        FISHEYE_EXTRINSICS_TABLE_MIN_SIZE,
    )?;
    let mut rotation = [0.0f32; 9];
    for (i, value) in rotation.iter_mut().enumerate() {
        *value = f32_at(raw, TABLE_HEADER_SIZE + i * 4);
    }
    let base = TABLE_HEADER_SIZE + 36;
    Ok(Pose {
        orientation: Matrix3(rotation),
        position: [
            f32_at(raw, base),
            f32_at(raw, base + 4),
            f32_at(raw, base + 8),
        ],
    })
}

/// Motion-module calibration: the imu-to-fisheye transform plus the
/// accel/gyro scale-and-bias matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuCalibrationTable {
    pub header: TableHeader,
    /// Rotation as stored by the hardware: column-major, nine f32s.
    pub imu_to_fisheye_rotation: [f32; 9],
    pub imu_to_fisheye_translation: [f32; 3],
    pub accel_intrinsics: MotionIntrinsics,
    pub gyro_intrinsics: MotionIntrinsics,
}

impl ImuCalibrationTable {
    pub fn parse(raw: &[u8]) -> Result<Self, HwMonitorError> {
        let header = validate(raw, "imu", IMU_TABLE_TYPE, IMU_VERSION_MAJOR, IMU_TABLE_MIN_SIZE)?;

        let mut rotation = [0.0f32; 9];
        for (i, value) in rotation.iter_mut().enumerate() {
            *value = f32_at(raw, TABLE_HEADER_SIZE + i * 4);
        }
        let trans_base = TABLE_HEADER_SIZE + 36;
        let translation = [
            f32_at(raw, trans_base),
            f32_at(raw, trans_base + 4),
            f32_at(raw, trans_base + 8),
        ];

        let motion = |base: usize| {
            let mut data = [[0.0f32; 4]; 3];
            for (row, row_data) in data.iter_mut().enumerate() {
                for (col, value) in row_data.iter_mut().enumerate() {
                    *value = f32_at(raw, base + (row * 4 + col) * 4);
                }
            }
            MotionIntrinsics { data }
        };

        Ok(Self {
            header,
            imu_to_fisheye_rotation: rotation,
            imu_to_fisheye_translation: translation,
            accel_intrinsics: motion(TABLE_HEADER_SIZE + 48),
            gyro_intrinsics: motion(TABLE_HEADER_SIZE + 96),
        })
    }
}
