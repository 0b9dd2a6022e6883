//! Calibration resolution
//!
//! Answers intrinsics/extrinsics queries from factory calibration. Raw
//! tables are fetched over the command channel on first use, validated,
//! and memoized: per table, the underlying command executes at most once
//! per resolver lifetime, and concurrent first callers share the one
//! outcome.

use rs4xx_core::intrinsics::{CameraIntrinsics, MotionIntrinsics};
use rs4xx_core::pose::{Matrix3, Pose};
use tracing::debug;

use crate::command::{opcode, Command};
use crate::error::HwMonitorError;
use crate::lazy::CachedFetch;
use crate::monitor::HwMonitor;
use crate::tables::{
    parse_fisheye_extrinsics, CalibrationTableId, CoefficientsTable, FisheyeIntrinsicsTable,
    ImuCalibrationTable, TABLE_HEADER_SIZE,
};

/// Stereo baseline is stored in millimeters; poses are in meters.
pub const BASELINE_METERS_PER_UNIT: f32 = 0.001;

/// Memory-mapped table addresses, read via the MMER command.
pub const FISHEYE_INTRINSICS_ADDRESS: u32 = 0x84;
pub const FISHEYE_INTRINSICS_READ_SIZE: u32 = 0x98;
pub const IMU_TABLE_ADDRESS: u32 = 0x134;
pub const IMU_TABLE_READ_SIZE: u32 = crate::tables::IMU_TABLE_MIN_SIZE as u32;

/// Direction of a stereo baseline extrinsics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineDirection {
    /// Left imager to right imager: positive translation along x.
    LeftToRight,
    /// Right imager to left imager: the exact negation.
    RightToLeft,
}

/// Lazily-fetching, memoizing view over the unit's calibration tables.
pub struct CalibrationResolver {
    monitor: HwMonitor,
    coefficients: CachedFetch<CoefficientsTable>,
    fisheye_intrinsics: CachedFetch<FisheyeIntrinsicsTable>,
    fisheye_extrinsics: CachedFetch<Pose>,
    imu_calibration: CachedFetch<ImuCalibrationTable>,
}

impl CalibrationResolver {
    pub fn new(monitor: HwMonitor) -> Self {
        Self {
            monitor,
            coefficients: CachedFetch::new(),
            fisheye_intrinsics: CachedFetch::new(),
            fisheye_extrinsics: CachedFetch::new(),
            imu_calibration: CachedFetch::new(),
        }
    }

    pub fn monitor(&self) -> &HwMonitor {
        &self.monitor
    }

    /// Fetch one raw calibration table by id.
    fn raw_calibration_table(&self, id: CalibrationTableId) -> Result<Vec<u8>, HwMonitorError> {
        debug!(table_id = id as u32, "fetching calibration table");
        let raw = self
            .monitor
            .send(&Command::with_params(opcode::GETINTCAL, id as u32, 0))?;
        if raw.len() < TABLE_HEADER_SIZE {
            return Err(HwMonitorError::ShortResponse {
                expected: TABLE_HEADER_SIZE,
                actual: raw.len(),
            });
        }
        Ok(raw)
    }

    /// Read a memory-mapped table at `(address, size)`.
    fn read_memory(&self, address: u32, size: u32) -> Result<Vec<u8>, HwMonitorError> {
        debug!(address, size, "reading memory-mapped table");
        self.monitor
            .send(&Command::with_params(opcode::MMER, address, size))
    }

    fn coefficients(&self) -> Result<CoefficientsTable, HwMonitorError> {
        self.coefficients.get_or_fetch(|| {
            let raw = self.raw_calibration_table(CalibrationTableId::Coefficients)?;
            CoefficientsTable::parse(&raw)
        })
    }

    fn fisheye_intrinsics(&self) -> Result<FisheyeIntrinsicsTable, HwMonitorError> {
        self.fisheye_intrinsics.get_or_fetch(|| {
            let raw =
                self.read_memory(FISHEYE_INTRINSICS_ADDRESS, FISHEYE_INTRINSICS_READ_SIZE)?;
            FisheyeIntrinsicsTable::parse(&raw)
        })
    }

    fn fisheye_extrinsics(&self) -> Result<Pose, HwMonitorError> {
        self.fisheye_extrinsics.get_or_fetch(|| {
            let raw = self.monitor.send(&Command::new(opcode::GET_EXTRINSICS))?;
            parse_fisheye_extrinsics(&raw)
        })
    }

    fn imu_calibration(&self) -> Result<ImuCalibrationTable, HwMonitorError> {
        self.imu_calibration.get_or_fetch(|| {
            let raw = self.read_memory(IMU_TABLE_ADDRESS, IMU_TABLE_READ_SIZE)?;
            ImuCalibrationTable::parse(&raw)
        })
    }

    /// Resolution-indexed intrinsics from the named table.
    pub fn intrinsics(
        &self,
        table: CalibrationTableId,
        width: u32,
        height: u32,
    ) -> Result<CameraIntrinsics, HwMonitorError> {
        match table {
            CalibrationTableId::Coefficients => {
                self.coefficients()?.intrinsics_at(width, height)
            }
            CalibrationTableId::Fisheye => {
                self.fisheye_intrinsics()?.intrinsics_at(width, height)
            }
            other => Err(HwMonitorError::TableFormat {
                table: "intrinsics",
                reason: format!("table id {} carries no resolution-indexed intrinsics", other as u32),
            }),
        }
    }

    /// Fixed dual-imager extrinsics: identity rotation with the baseline
    /// translation along x, signed by direction.
    pub fn baseline_extrinsics(&self, direction: BaselineDirection) -> Result<Pose, HwMonitorError> {
        let baseline = self.coefficients()?.baseline;
        let sign = match direction {
            BaselineDirection::LeftToRight => 1.0,
            BaselineDirection::RightToLeft => -1.0,
        };
        Ok(Pose {
            orientation: Matrix3::IDENTITY,
            position: [sign * BASELINE_METERS_PER_UNIT * baseline, 0.0, 0.0],
        })
    }

    /// Fisheye sensor pose relative to the reference (depth) sensor: the
    /// inverse of the transform stored in the extrinsics table.
    pub fn fisheye_pose(&self) -> Result<Pose, HwMonitorError> {
        Ok(self.fisheye_extrinsics()?.inverse())
    }

    /// Motion-module pose, chained through the fisheye sensor.
    pub fn motion_module_pose(&self) -> Result<Pose, HwMonitorError> {
        let fisheye = self.fisheye_pose()?;
        let imu = self.imu_calibration()?;

        // The stored rotation is column-major.
        let stored = |row: usize, col: usize| imu.imu_to_fisheye_rotation[col * 3 + row];

        // Element order kept exactly as devices were calibrated against.
        // TODO: confirm with the calibration owners - (1,0) is read twice
        // and (0,1) never, which looks like a transcription slip.
        let orientation = Matrix3([
            stored(0, 0),
            stored(1, 0),
            stored(2, 0),
            stored(1, 0),
            stored(1, 1),
            stored(2, 1),
            stored(0, 2),
            stored(1, 2),
            stored(2, 2),
        ]);
        let imu_to_fisheye = Pose {
            orientation,
            position: imu.imu_to_fisheye_translation,
        };

        Ok(fisheye * imu_to_fisheye)
    }

    pub fn accel_intrinsics(&self) -> Result<MotionIntrinsics, HwMonitorError> {
        Ok(self.imu_calibration()?.accel_intrinsics)
    }

    pub fn gyro_intrinsics(&self) -> Result<MotionIntrinsics, HwMonitorError> {
        Ok(self.imu_calibration()?.gyro_intrinsics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandChannel;
    use crate::tables::test_fixtures;
    use std::sync::{Arc, Mutex};

    /// Channel serving calibration fixtures and counting every command.
    struct MockChannel {
        coefficients: Vec<u8>,
        fisheye_intrinsics: Vec<u8>,
        fisheye_extrinsics: Vec<u8>,
        imu: Vec<u8>,
        sent: Mutex<Vec<Command>>,
    }

    impl MockChannel {
        fn with_fixtures() -> Self {
            Self {
                coefficients: test_fixtures::coefficients_blob(55.0),
                fisheye_intrinsics: test_fixtures::fisheye_intrinsics_blob(640, 480),
                fisheye_extrinsics: test_fixtures::fisheye_extrinsics_blob(
                    [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
                    [0.0, 0.0, 0.0],
                ),
                imu: test_fixtures::imu_blob(
                    [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
                    [0.0, 0.0, 0.0],
                ),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn count(&self, op: u32) -> usize {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.opcode == op)
                .count()
        }
    }

    impl CommandChannel for MockChannel {
        fn send(&self, cmd: &Command) -> anyhow::Result<Vec<u8>> {
            self.sent.lock().unwrap().push(cmd.clone());
            match cmd.opcode {
                opcode::GETINTCAL => Ok(self.coefficients.clone()),
                opcode::GET_EXTRINSICS => Ok(self.fisheye_extrinsics.clone()),
                opcode::MMER if cmd.param1 == FISHEYE_INTRINSICS_ADDRESS => {
                    Ok(self.fisheye_intrinsics.clone())
                }
                opcode::MMER if cmd.param1 == IMU_TABLE_ADDRESS => Ok(self.imu.clone()),
                other => anyhow::bail!("unexpected opcode {other:#x}"),
            }
        }

        fn send_raw(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
            Ok(data.to_vec())
        }
    }

    fn resolver(channel: &Arc<MockChannel>) -> CalibrationResolver {
        CalibrationResolver::new(HwMonitor::new(Arc::clone(channel) as Arc<dyn CommandChannel>))
    }

    #[test]
    fn test_intrinsics_memoized_single_fetch() {
        let channel = Arc::new(MockChannel::with_fixtures());
        let resolver = resolver(&channel);

        let first = resolver
            .intrinsics(CalibrationTableId::Coefficients, 1280, 720)
            .unwrap();
        for _ in 0..4 {
            let again = resolver
                .intrinsics(CalibrationTableId::Coefficients, 1280, 720)
                .unwrap();
            assert_eq!(again, first);
        }
        assert_eq!(channel.count(opcode::GETINTCAL), 1);
    }

    #[test]
    fn test_baseline_sign_convention() {
        let channel = Arc::new(MockChannel::with_fixtures());
        let resolver = resolver(&channel);

        let ltr = resolver
            .baseline_extrinsics(BaselineDirection::LeftToRight)
            .unwrap();
        let rtl = resolver
            .baseline_extrinsics(BaselineDirection::RightToLeft)
            .unwrap();

        assert!((ltr.position[0] - 0.055).abs() < 1e-6);
        assert_eq!(ltr.position[0], -rtl.position[0]);
        assert_eq!(ltr.orientation, Matrix3::IDENTITY);
        // The table itself was still only fetched once.
        assert_eq!(channel.count(opcode::GETINTCAL), 1);
    }

    #[test]
    fn test_fisheye_pose_is_inverse_of_table() {
        let mut channel = MockChannel::with_fixtures();
        // 90 degrees about z with an offset; the pose must be its inverse.
        channel.fisheye_extrinsics = test_fixtures::fisheye_extrinsics_blob(
            [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            [0.01, 0.02, 0.03],
        );
        let channel = Arc::new(channel);
        let resolver = resolver(&channel);

        let pose = resolver.fisheye_pose().unwrap();
        let expected = Pose {
            orientation: Matrix3([0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
            position: [0.01, 0.02, 0.03],
        }
        .inverse();
        assert_eq!(pose, expected);
    }

    #[test]
    fn test_motion_pose_reindexes_stored_rotation() {
        let mut channel = MockChannel::with_fixtures();
        // Distinct entries so the re-indexing is observable. Stored
        // column-major: stored(r, c) = raw[c * 3 + r].
        channel.imu = test_fixtures::imu_blob(
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
            [0.1, 0.2, 0.3],
        );
        let channel = Arc::new(channel);
        let resolver = resolver(&channel);

        let pose = resolver.motion_module_pose().unwrap();
        // Fisheye extrinsics fixture is identity, so the result is the
        // re-indexed imu transform itself, (1,0) entry duplicated.
        assert_eq!(pose.orientation.0, [1.0, 2.0, 3.0, 2.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(pose.position, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_failed_fetch_memoized_and_surfaced() {
        let mut channel = MockChannel::with_fixtures();
        channel.coefficients = vec![0u8; 4]; // below header size
        let channel = Arc::new(channel);
        let resolver = resolver(&channel);

        for _ in 0..3 {
            let err = resolver
                .intrinsics(CalibrationTableId::Coefficients, 1280, 720)
                .unwrap_err();
            assert_eq!(
                err,
                HwMonitorError::ShortResponse {
                    expected: TABLE_HEADER_SIZE,
                    actual: 4
                }
            );
        }
        assert_eq!(channel.count(opcode::GETINTCAL), 1);
    }

    #[test]
    fn test_non_intrinsics_table_rejected() {
        let channel = Arc::new(MockChannel::with_fixtures());
        let resolver = resolver(&channel);
        assert!(matches!(
            resolver.intrinsics(CalibrationTableId::Rgb, 640, 480),
            Err(HwMonitorError::TableFormat { .. })
        ));
        // No command was issued for the rejected query.
        assert_eq!(channel.count(opcode::GETINTCAL), 0);
    }
}
