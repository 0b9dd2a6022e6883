//! Device construction: the ordered registration sequence that turns an
//! enumerated device group into a fully configured camera.
//!
//! The depth endpoint is always built first and gives us the hardware
//! monitor; everything after that is gated on the product id and the
//! firmware version it reports. Fisheye SKUs additionally get a wide-FOV
//! imager and a HID motion module, color SKUs a dedicated RGB imager.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use rs4xx_core::{
    metadata, CameraInfo, CameraInfoMap, CameraIntrinsics, FirmwareVersion, MotionIntrinsics,
    Pose, ProductId,
};
use rs4xx_hwmon::{
    gvd, opcode, BaselineDirection, CalibrationResolver, CalibrationTableId, Command,
    CommandChannel, HwMonitor, HwMonitorError,
};

use crate::auto_exposure::register_auto_exposure_options;
use crate::capability::{
    is_color_sku, is_fisheye_sku, is_laser_sku, CapabilityProfile, Feature,
};
use crate::endpoint::{
    depth_ctrl, ControlSpec, DeviceGroup, EndpointFactory, InfoRegistry, OptionId, PixelFormat,
    PoseFn, SensorEndpoint, SubInterface, DEPTH_XU, FISHEYE_XU,
};
use crate::roi::{AutoExposureRoiMethod, HwRoiMethod};

/// Meters per depth unit when the scale is not negotiable in hardware.
pub const DEFAULT_DEPTH_UNITS: f32 = 0.001;

const DEPTH_INTERFACE_INDEX: u8 = 0;
const SECONDARY_INTERFACE_INDEX: u8 = 3;

#[derive(Error, Debug)]
pub enum DeviceError {
    /// The enumerated group does not have the interfaces the SKU requires.
    #[error("device topology mismatch: {0}")]
    Topology(String),
    #[error(transparent)]
    Monitor(#[from] HwMonitorError),
    #[error("endpoint construction failed: {0}")]
    Endpoint(#[source] anyhow::Error),
}

/// Motion sensors of the IMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionSensor {
    Accel,
    Gyro,
}

/// A fully constructed camera: its endpoints, the hardware monitor and
/// the calibration resolver behind them.
pub struct Camera {
    monitor: HwMonitor,
    resolver: Arc<CalibrationResolver>,
    endpoints: Vec<Box<dyn SensorEndpoint>>,
    depth_index: usize,
    fisheye_index: Option<usize>,
    motion_index: Option<usize>,
    color_index: Option<usize>,
    product_id: ProductId,
    firmware_version: FirmwareVersion,
    serial: String,
    advanced_mode: bool,
}

impl Camera {
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        group: &DeviceGroup,
        factory: &dyn EndpointFactory,
        registry: &mut dyn InfoRegistry,
    ) -> Result<Self, DeviceError> {
        let product_id = group.product_id;
        info!(product_id = %product_id.hex_string(), "constructing camera");

        // A multi-pin depth node may enumerate as several index-0
        // sub-interfaces backed by the same device; the first one addresses
        // them all. Only the secondary imager carries an exactly-one rule.
        let depth_interface = group
            .video
            .iter()
            .find(|i| i.index == DEPTH_INTERFACE_INDEX)
            .ok_or_else(|| {
                DeviceError::Topology("depth sub-interface (index 0) is missing".into())
            })?;
        let mut depth = factory
            .create_video_endpoint(depth_interface)
            .map_err(DeviceError::Endpoint)?;

        depth.register_xu(DEPTH_XU);
        for format in [
            PixelFormat::Z16,
            PixelFormat::Y8,
            PixelFormat::Yuyv,
            PixelFormat::Uyvy,
            PixelFormat::Rgb8,
        ] {
            depth.register_pixel_format(format);
        }
        if is_laser_sku(product_id) {
            depth.register_option(
                OptionId::EmitterEnabled,
                ControlSpec::XuU8 {
                    xu: DEPTH_XU,
                    control: depth_ctrl::EMITTER_ENABLED,
                    description: "Laser emitter state",
                },
            );
            depth.register_option(
                OptionId::LaserPower,
                ControlSpec::XuU16 {
                    xu: DEPTH_XU,
                    control: depth_ctrl::LASER_POWER,
                    description: "Manual laser power, milliwatts",
                },
            );
        }
        depth.set_pose(const_pose(Pose::IDENTITY));

        let monitor = HwMonitor::new(channel);
        let resolver = Arc::new(CalibrationResolver::new(monitor.clone()));

        let firmware_version = monitor.firmware_version(gvd::CAMERA_FW_VERSION_OFFSET)?;
        let serial = monitor.module_serial(gvd::MODULE_SERIAL_OFFSET)?;
        let advanced_mode = monitor.is_in_advanced_mode()?;
        let caps = CapabilityProfile::evaluate(product_id, firmware_version);
        debug!(%firmware_version, serial, advanced_mode, "device identity resolved");

        if advanced_mode {
            depth.register_pixel_format(PixelFormat::Y8i);
            depth.register_pixel_format(PixelFormat::Y12i);
        }

        let mut camera_locked = None;
        let mut motion_module_fw = None;

        if caps.enabled(Feature::ExtendedDepthControls) {
            camera_locked = Some(monitor.is_camera_locked(gvd::IS_CAMERA_LOCKED_OFFSET)?);

            let exposure = ControlSpec::XuU32 {
                xu: DEPTH_XU,
                control: depth_ctrl::EXPOSURE,
                description: "Depth exposure time, microseconds",
            };
            depth.register_option(
                OptionId::EnableAutoExposure,
                ControlSpec::XuU8 {
                    xu: DEPTH_XU,
                    control: depth_ctrl::ENABLE_AUTO_EXPOSURE,
                    description: "Enable auto exposure",
                },
            );
            depth.register_option(
                OptionId::Gain,
                ControlSpec::AutoDisabling {
                    inner: Box::new(ControlSpec::Pu(OptionId::Gain)),
                    switch: OptionId::EnableAutoExposure,
                },
            );
            depth.register_option(
                OptionId::Exposure,
                ControlSpec::AutoDisabling {
                    inner: Box::new(exposure),
                    switch: OptionId::EnableAutoExposure,
                },
            );
            if caps.enabled(Feature::AutoWhiteBalance) {
                depth.register_option(
                    OptionId::EnableAutoWhiteBalance,
                    ControlSpec::XuU8 {
                        xu: DEPTH_XU,
                        control: depth_ctrl::ENABLE_AUTO_WHITE_BALANCE,
                        description: "Enable auto white balance",
                    },
                );
            }
        }

        if caps.enabled(Feature::TriggerOutput) {
            depth.register_option(
                OptionId::OutputTriggerEnabled,
                ControlSpec::XuU8 {
                    xu: DEPTH_XU,
                    control: depth_ctrl::EXT_TRIGGER,
                    description: "Generate trigger from the camera to external device once per frame",
                },
            );
        }
        if caps.enabled(Feature::ErrorPolling) {
            depth.register_option(
                OptionId::ErrorPollingEnabled,
                ControlSpec::ErrorPolling {
                    source: Box::new(ControlSpec::XuU8 {
                        xu: DEPTH_XU,
                        control: depth_ctrl::ERROR_REPORTING,
                        description: "Hardware fault register",
                    }),
                },
            );
        }
        if caps.enabled(Feature::AsicTemperature) {
            depth.register_option(
                OptionId::AsicTemperature,
                ControlSpec::TemperatureTelemetry {
                    description: "Current ASIC temperature, degrees Celsius",
                },
            );
        }
        if caps.enabled(Feature::ProjectorTemperature) {
            depth.register_option(
                OptionId::ProjectorTemperature,
                ControlSpec::TemperatureTelemetry {
                    description: "Current projector temperature, degrees Celsius",
                },
            );
        }
        if caps.enabled(Feature::MotionModuleFwVersion) {
            motion_module_fw =
                Some(monitor.firmware_version(gvd::MOTION_MODULE_FW_VERSION_OFFSET)?);
        }

        depth.set_roi_method(Box::new(HwRoiMethod::new(monitor.clone())));
        depth.register_option(
            OptionId::DepthUnits,
            if advanced_mode {
                ControlSpec::HardwareDepthScale
            } else {
                ControlSpec::ConstValue {
                    description: "Meters represented by a single depth unit",
                    value: DEFAULT_DEPTH_UNITS,
                }
            },
        );
        for (field, parser) in metadata::depth_attributes() {
            depth.register_metadata(field, parser);
        }

        let mut endpoints: Vec<Box<dyn SensorEndpoint>> = vec![depth];
        let depth_index = 0;
        let mut fisheye_index = None;
        let mut motion_index = None;
        let mut color_index = None;

        if is_fisheye_sku(product_id) {
            let interface = expect_single_secondary(group, "fisheye")?;
            let mut fisheye = factory
                .create_video_endpoint(interface)
                .map_err(DeviceError::Endpoint)?;

            fisheye.register_xu(FISHEYE_XU);
            fisheye.register_pixel_format(PixelFormat::Raw8);
            fisheye.register_pixel_format(PixelFormat::Raw8UnpatchedKernel);

            if caps.enabled(Feature::FisheyeAutoExposure) {
                let mechanism = register_auto_exposure_options(fisheye.as_mut(), &FISHEYE_XU);
                fisheye.set_roi_method(Box::new(AutoExposureRoiMethod::new(mechanism)));
            } else {
                fisheye.register_pu(OptionId::Gain);
                fisheye.register_option(
                    OptionId::Exposure,
                    ControlSpec::XuU16 {
                        xu: FISHEYE_XU,
                        control: crate::endpoint::fisheye_ctrl::EXPOSURE,
                        description: "Exposure time of the fisheye imager",
                    },
                );
            }
            for (field, parser) in metadata::fisheye_attributes() {
                fisheye.register_metadata(field, parser);
            }
            fisheye.set_pose(resolver_pose(&resolver, PoseSource::Fisheye));

            fisheye_index = Some(endpoints.len());
            endpoints.push(fisheye);

            let hid = group.hid.first().ok_or_else(|| {
                DeviceError::Topology("motion module HID interface is missing".into())
            })?;
            let mut motion = factory
                .create_motion_endpoint(hid)
                .map_err(DeviceError::Endpoint)?;

            motion.register_pixel_format(PixelFormat::AccelAxes);
            motion.register_pixel_format(PixelFormat::GyroAxes);
            if caps.enabled(Feature::CustomHidProfiles) {
                motion.register_pixel_format(PixelFormat::GpioRaw);
                motion.register_option(
                    OptionId::MotionModuleTemperature,
                    ControlSpec::TemperatureTelemetry {
                        description: "Current motion module temperature, degrees Celsius",
                    },
                );
            }

            // Motion correction needs the IMU calibration; a device with a
            // bad table still constructs, just without the option.
            match resolver
                .accel_intrinsics()
                .and_then(|_| resolver.gyro_intrinsics())
            {
                Ok(_) => {
                    motion.register_option(
                        OptionId::EnableMotionCorrection,
                        ControlSpec::MotionCorrection,
                    );
                }
                Err(err) => {
                    warn!(%err, "IMU calibration unavailable, motion correction disabled");
                }
            }
            motion.set_pose(resolver_pose(&resolver, PoseSource::MotionModule));

            motion_index = Some(endpoints.len());
            endpoints.push(motion);
        } else if is_color_sku(product_id) {
            let interface = expect_single_secondary(group, "color")?;
            let mut color = factory
                .create_video_endpoint(interface)
                .map_err(DeviceError::Endpoint)?;

            for format in [PixelFormat::Yuyv, PixelFormat::Yuy2, PixelFormat::Bayer16] {
                color.register_pixel_format(format);
            }
            for id in [
                OptionId::BacklightCompensation,
                OptionId::Brightness,
                OptionId::Contrast,
                OptionId::Exposure,
                OptionId::Gamma,
                OptionId::Hue,
                OptionId::Saturation,
                OptionId::Sharpness,
                OptionId::WhiteBalance,
                OptionId::EnableAutoExposure,
                OptionId::EnableAutoWhiteBalance,
                OptionId::Gain,
            ] {
                color.register_pu(id);
            }
            color.set_pose(const_pose(Pose::IDENTITY));

            color_index = Some(endpoints.len());
            endpoints.push(color);
        }

        let camera = Self {
            monitor,
            resolver,
            endpoints,
            depth_index,
            fisheye_index,
            motion_index,
            color_index,
            product_id,
            firmware_version,
            serial,
            advanced_mode,
        };
        camera.register_info(group, registry, camera_locked, motion_module_fw);
        Ok(camera)
    }

    fn register_info(
        &self,
        group: &DeviceGroup,
        registry: &mut dyn InfoRegistry,
        camera_locked: Option<bool>,
        motion_module_fw: Option<FirmwareVersion>,
    ) {
        let location_of = |index: u8| {
            group
                .video
                .iter()
                .find(|i| i.index == index)
                .map(|i| i.device_path.clone())
                .unwrap_or_default()
        };

        let base = |module: &str, location: String| -> CameraInfoMap {
            let mut info = CameraInfoMap::new();
            info.insert(
                CameraInfo::DeviceName,
                self.product_id.display_name().to_string(),
            );
            info.insert(CameraInfo::ModuleName, module.to_string());
            info.insert(CameraInfo::SerialNumber, self.serial.clone());
            info.insert(
                CameraInfo::FirmwareVersion,
                self.firmware_version.to_string(),
            );
            info.insert(CameraInfo::DeviceLocation, location);
            info.insert(CameraInfo::ProductId, self.product_id.hex_string());
            info
        };
        let yes_no = |flag: bool| if flag { "YES" } else { "NO" }.to_string();
        // Lock flag and motion-module fw go on every map that has them;
        // the advanced-mode flag is a depth-map entry only.
        let gated = |info: &mut CameraInfoMap| {
            if let Some(locked) = camera_locked {
                info.insert(CameraInfo::CameraLocked, yes_no(locked));
            }
            if let Some(fw) = motion_module_fw {
                info.insert(CameraInfo::MotionModuleFirmwareVersion, fw.to_string());
            }
        };

        let mut depth_info = base("Stereo Module", location_of(DEPTH_INTERFACE_INDEX));
        depth_info.insert(CameraInfo::DebugOpCode, opcode::GLD.to_string());
        depth_info.insert(CameraInfo::AdvancedMode, yes_no(self.advanced_mode));
        gated(&mut depth_info);
        registry.register_endpoint_info(self.depth_index, depth_info);

        if let Some(index) = self.fisheye_index {
            let mut info = base("Fisheye Camera", location_of(SECONDARY_INTERFACE_INDEX));
            gated(&mut info);
            registry.register_endpoint_info(index, info);
        }
        if let Some(index) = self.motion_index {
            let location = group
                .hid
                .first()
                .map(|h| h.device_path.clone())
                .unwrap_or_default();
            let mut info = base("Motion Module", location);
            info.insert(CameraInfo::DebugOpCode, opcode::GLD.to_string());
            gated(&mut info);
            registry.register_endpoint_info(index, info);
        }
        if let Some(index) = self.color_index {
            registry.register_endpoint_info(
                index,
                base("RGB Camera", location_of(SECONDARY_INTERFACE_INDEX)),
            );
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn firmware_version(&self) -> FirmwareVersion {
        self.firmware_version
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn is_in_advanced_mode(&self) -> bool {
        self.advanced_mode
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn depth_index(&self) -> usize {
        self.depth_index
    }

    pub fn fisheye_index(&self) -> Option<usize> {
        self.fisheye_index
    }

    pub fn motion_index(&self) -> Option<usize> {
        self.motion_index
    }

    pub fn color_index(&self) -> Option<usize> {
        self.color_index
    }

    /// Reboot the device. Enumeration starts over afterwards.
    pub fn hardware_reset(&self) -> Result<(), HwMonitorError> {
        self.monitor.hardware_reset()
    }

    /// Pass pre-encoded bytes straight through to the embedded controller.
    /// Diagnostic tooling only; the payload is not validated.
    pub fn send_receive_raw_data(&self, input: &[u8]) -> anyhow::Result<Vec<u8>> {
        self.monitor.send_raw(input)
    }

    /// Execute one structured monitor command.
    pub fn send_command(&self, command: &Command) -> Result<Vec<u8>, HwMonitorError> {
        self.monitor.send(command)
    }

    /// Calibrated intrinsics of a video endpoint at a streaming resolution.
    pub fn intrinsics(
        &self,
        endpoint_index: usize,
        width: u32,
        height: u32,
    ) -> Result<CameraIntrinsics, DeviceError> {
        let table = if endpoint_index == self.depth_index {
            CalibrationTableId::Coefficients
        } else if Some(endpoint_index) == self.fisheye_index {
            CalibrationTableId::Fisheye
        } else {
            return Err(DeviceError::Topology(format!(
                "endpoint {endpoint_index} has no resolution-indexed intrinsics"
            )));
        };
        Ok(self.resolver.intrinsics(table, width, height)?)
    }

    /// Pose of an endpoint relative to the depth sensor.
    pub fn pose(&self, endpoint_index: usize) -> Result<Pose, DeviceError> {
        if endpoint_index == self.depth_index || Some(endpoint_index) == self.color_index {
            Ok(Pose::IDENTITY)
        } else if Some(endpoint_index) == self.fisheye_index {
            Ok(self.resolver.fisheye_pose()?)
        } else if Some(endpoint_index) == self.motion_index {
            Ok(self.resolver.motion_module_pose()?)
        } else {
            Err(DeviceError::Topology(format!(
                "endpoint {endpoint_index} does not exist"
            )))
        }
    }

    /// Stereo baseline transform between the two depth imagers.
    pub fn baseline_extrinsics(
        &self,
        direction: BaselineDirection,
    ) -> Result<Pose, DeviceError> {
        Ok(self.resolver.baseline_extrinsics(direction)?)
    }

    pub fn motion_intrinsics(
        &self,
        sensor: MotionSensor,
    ) -> Result<MotionIntrinsics, DeviceError> {
        let intrinsics = match sensor {
            MotionSensor::Accel => self.resolver.accel_intrinsics()?,
            MotionSensor::Gyro => self.resolver.gyro_intrinsics()?,
        };
        Ok(intrinsics)
    }
}

fn expect_single_secondary<'a>(
    group: &'a DeviceGroup,
    role: &str,
) -> Result<&'a SubInterface, DeviceError> {
    let interfaces = group.video_with_index(SECONDARY_INTERFACE_INDEX);
    match interfaces.as_slice() {
        [only] => Ok(*only),
        other => Err(DeviceError::Topology(format!(
            "expected exactly one {role} sub-interface, found {}",
            other.len()
        ))),
    }
}

fn const_pose(pose: Pose) -> PoseFn {
    Arc::new(move || Ok(pose))
}

#[derive(Clone, Copy)]
enum PoseSource {
    Fisheye,
    MotionModule,
}

fn resolver_pose(resolver: &Arc<CalibrationResolver>, source: PoseSource) -> PoseFn {
    let resolver = Arc::clone(resolver);
    Arc::new(move || match source {
        PoseSource::Fisheye => resolver.fisheye_pose(),
        PoseSource::MotionModule => resolver.motion_module_pose(),
    })
}
