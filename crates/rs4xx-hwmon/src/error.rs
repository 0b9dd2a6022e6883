//! Hardware-monitor error taxonomy
//!
//! `Clone` is required: the lazy table cache memoizes the first outcome,
//! success or failure, and hands the same error to every later caller
//! without re-issuing the command.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HwMonitorError {
    /// The command channel itself failed. Fatal, never retried here.
    #[error("command channel failure: {0}")]
    Transport(String),

    /// The channel replied, but with fewer bytes than the reply can
    /// legally have. Indicates a firmware/host mismatch.
    #[error("response too short: expected at least {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    /// A calibration blob failed its version/type/size check and must not
    /// be reinterpreted.
    #[error("{table} calibration table rejected: {reason}")]
    TableFormat {
        table: &'static str,
        reason: String,
    },

    /// The validated table has no entry for the requested resolution.
    #[error("no calibration entry for {width}x{height}")]
    UnsupportedResolution { width: u32, height: u32 },
}

impl HwMonitorError {
    pub(crate) fn transport(err: anyhow::Error) -> Self {
        HwMonitorError::Transport(format!("{err:#}"))
    }
}
