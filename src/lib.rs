//! ltfsadm Library
//!
//! Administration core for LTFS tape drives on Linux: discovery of
//! `st*`/`nst*` device nodes, drive selection, and mount, format,
//! diagnostic and MAM operations driven through external tools.

pub mod cli;
pub mod commands;
pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod logger;
pub mod runner;
pub mod tape_ops;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export key types for easier use
pub use config::{Config, DiscoveryPolicy};
pub use device::{
    select_device, DiscoveryResult, Discoverer, ModeSuffix, PhysicalDrive, RewindPreference,
    TapeDeviceNode,
};
pub use error::{LtfsAdminError, Result};
pub use runner::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use tape_ops::TapeOperations;
