//! RS4xx hardware monitor - command protocol and calibration resolution
//!
//! Everything the driver asks the camera's embedded controller is a
//! `Command` sent over the abstract `CommandChannel`. On top of that this
//! crate resolves factory calibration: raw tables are fetched lazily,
//! validated before any byte is interpreted, memoized for the life of the
//! resolver, and turned into typed intrinsics and cross-sensor poses.

pub mod command;
pub mod error;
pub mod lazy;
pub mod monitor;
pub mod resolver;
pub mod tables;

pub use command::{opcode, Command, CommandChannel};
pub use error::HwMonitorError;
pub use lazy::CachedFetch;
pub use monitor::{gvd, HwMonitor};
pub use resolver::{BaselineDirection, CalibrationResolver};
pub use tables::{CalibrationTableId, CoefficientsTable, TableHeader};
