//! Fixed hardware-monitor queries
//!
//! Thin, synchronous wrappers over the command channel for the fixed
//! queries every unit answers: the general version/device (GVD) table
//! reads, the advanced-mode flag, hardware reset, and the raw diagnostic
//! pass-through.

use std::sync::Arc;

use rs4xx_core::version::FirmwareVersion;
use tracing::{debug, trace};

use crate::command::{opcode, Command, CommandChannel};
use crate::error::HwMonitorError;

/// Byte offsets into the GVD table.
pub mod gvd {
    pub const CAMERA_FW_VERSION_OFFSET: usize = 12;
    pub const IS_CAMERA_LOCKED_OFFSET: usize = 25;
    pub const MODULE_SERIAL_OFFSET: usize = 48;
    pub const MODULE_SERIAL_SIZE: usize = 6;
    pub const MOTION_MODULE_FW_VERSION_OFFSET: usize = 212;
}

/// Command-level access to the embedded controller.
#[derive(Clone)]
pub struct HwMonitor {
    channel: Arc<dyn CommandChannel>,
}

impl HwMonitor {
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self { channel }
    }

    /// Execute one command, mapping channel failures into the structured
    /// taxonomy. No retries: a failure surfaces to the caller as is.
    pub fn send(&self, cmd: &Command) -> Result<Vec<u8>, HwMonitorError> {
        trace!(opcode = cmd.opcode, "sending hw-monitor command");
        let response = self.channel.send(cmd).map_err(HwMonitorError::transport)?;
        trace!(
            opcode = cmd.opcode,
            response_len = response.len(),
            "hw-monitor response"
        );
        Ok(response)
    }

    /// Diagnostic pass-through of pre-encoded bytes.
    pub fn send_raw(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        self.channel.send_raw(data)
    }

    pub fn hardware_reset(&self) -> Result<(), HwMonitorError> {
        debug!("issuing hardware reset");
        self.send(&Command::new(opcode::HWRST))?;
        Ok(())
    }

    /// Query whether the unit is in advanced mode (first response byte
    /// nonzero).
    pub fn is_in_advanced_mode(&self) -> Result<bool, HwMonitorError> {
        let response = self.send(&Command::new(opcode::UAMG))?;
        match response.first() {
            Some(&flag) => Ok(flag != 0),
            None => Err(HwMonitorError::ShortResponse {
                expected: 1,
                actual: 0,
            }),
        }
    }

    fn gvd_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, HwMonitorError> {
        let response = self.send(&Command::new(opcode::GVD))?;
        if response.len() < offset + len {
            return Err(HwMonitorError::ShortResponse {
                expected: offset + len,
                actual: response.len(),
            });
        }
        Ok(response[offset..offset + len].to_vec())
    }

    /// Firmware version from the GVD table at the given byte offset.
    pub fn firmware_version(&self, offset: usize) -> Result<FirmwareVersion, HwMonitorError> {
        let bytes = self.gvd_bytes(offset, 4)?;
        Ok(FirmwareVersion::from_table_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]))
    }

    /// Module serial, rendered as uppercase hex.
    pub fn module_serial(&self, offset: usize) -> Result<String, HwMonitorError> {
        let bytes = self.gvd_bytes(offset, gvd::MODULE_SERIAL_SIZE)?;
        Ok(bytes.iter().map(|b| format!("{b:02X}")).collect())
    }

    /// Factory lock flag from the GVD table.
    pub fn is_camera_locked(&self, offset: usize) -> Result<bool, HwMonitorError> {
        let bytes = self.gvd_bytes(offset, 1)?;
        Ok(bytes[0] != 0)
    }
}
