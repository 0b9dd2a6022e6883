//! Command model and the abstract channel to the embedded controller

use serde::{Deserialize, Serialize};

/// Hardware-monitor opcodes. The values are part of the device protocol
/// and must not change.
pub mod opcode {
    /// Get log dump (advertised as the debug opcode in the info map).
    pub const GLD: u32 = 0x0f;
    /// Get general version/device table.
    pub const GVD: u32 = 0x10;
    /// Get internal calibration table by id.
    pub const GETINTCAL: u32 = 0x15;
    /// Hardware reset.
    pub const HWRST: u32 = 0x20;
    /// Is-in-advanced-mode query.
    pub const UAMG: u32 = 0x30;
    /// Set auto-exposure region of interest.
    pub const SETAEROI: u32 = 0x44;
    /// Get auto-exposure region of interest.
    pub const GETAEROI: u32 = 0x45;
    /// Read an arbitrary motion-module memory range (offset, size).
    pub const MMER: u32 = 0x4f;
    /// Get fisheye extrinsics table.
    pub const GET_EXTRINSICS: u32 = 0x53;
}

/// One request to the embedded controller: an opcode, up to four numeric
/// parameters and an optional payload. Immutable once built; the channel
/// does not retain it beyond the send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub opcode: u32,
    pub param1: u32,
    pub param2: u32,
    pub param3: u32,
    pub param4: u32,
    pub data: Vec<u8>,
}

impl Command {
    pub fn new(opcode: u32) -> Self {
        Self {
            opcode,
            param1: 0,
            param2: 0,
            param3: 0,
            param4: 0,
            data: Vec::new(),
        }
    }

    pub fn with_params(opcode: u32, param1: u32, param2: u32) -> Self {
        Self {
            param1,
            param2,
            ..Self::new(opcode)
        }
    }
}

/// Request/response transport to the camera's embedded controller.
///
/// Implementations execute one command synchronously and return the raw
/// reply bytes. Commands are not assumed to be safely concurrent: the
/// channel is responsible for serializing access to the hardware.
pub trait CommandChannel: Send + Sync {
    /// Execute a command and return the raw response bytes.
    fn send(&self, cmd: &Command) -> anyhow::Result<Vec<u8>>;

    /// Pass-through send of pre-encoded bytes, for diagnostic tooling.
    fn send_raw(&self, data: &[u8]) -> anyhow::Result<Vec<u8>>;
}
