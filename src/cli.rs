use crate::device::RewindPreference;
use crate::tape_ops::{MtOperation, SuiteKind};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ltfsadm")]
#[command(about = "Administer LTFS tape drives: discovery, mounting, formatting and diagnostics")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Specify configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Which device node an operation targets
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceArgs {
    /// Tape device path, bypassing drive selection
    #[arg(short, long, value_name = "DEVICE")]
    pub device: Option<PathBuf>,

    /// Physical drive number (defaults to the lowest-numbered drive)
    #[arg(long, value_name = "N", conflicts_with = "device")]
    pub drive: Option<u32>,

    /// Use the non-rewinding node (nst*)
    #[arg(long, conflicts_with = "device")]
    pub non_rewinding: bool,

    /// Density/compression mode suffix
    #[arg(short, long, value_parser = ["default", "a", "l", "m"], conflicts_with = "device")]
    pub mode: Option<String>,
}

impl DeviceArgs {
    pub fn rewind_preference(&self) -> RewindPreference {
        if self.non_rewinding {
            RewindPreference::NonRewinding
        } else {
            RewindPreference::Rewinding
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tape devices
    List {
        /// Show modes per physical drive
        #[arg(short, long)]
        detailed: bool,

        /// Print the discovery result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the device path that would be selected
    Select {
        #[command(flatten)]
        target: DeviceArgs,
    },

    /// Get tape information (mt status)
    Info {
        #[command(flatten)]
        target: DeviceArgs,
    },

    /// Run a magnetic tape control operation
    Mt {
        #[command(flatten)]
        target: DeviceArgs,

        #[command(subcommand)]
        operation: MtOperation,
    },

    /// Eject the cartridge
    Eject {
        #[command(flatten)]
        target: DeviceArgs,
    },

    /// Mount the tape as an LTFS filesystem
    Mount {
        #[command(flatten)]
        target: DeviceArgs,

        /// Mount point (defaults to the configured one)
        #[arg(value_name = "MOUNT_POINT")]
        mount_point: Option<PathBuf>,

        /// Extra ltfs option, may be repeated
        #[arg(short = 'o', long = "option", value_name = "OPTION")]
        options: Vec<String>,
    },

    /// Unmount an LTFS filesystem
    Unmount {
        #[arg(value_name = "MOUNT_POINT")]
        mount_point: PathBuf,
    },

    /// List mounted LTFS filesystems
    Mounts,

    /// Format the tape with LTFS (erases all data)
    Format {
        #[command(flatten)]
        target: DeviceArgs,

        /// Volume label
        #[arg(short = 'n', long)]
        label: Option<String>,

        /// Force formatting of an already formatted tape
        #[arg(short, long)]
        force: bool,

        /// Block size in bytes
        #[arg(short, long)]
        block_size: Option<u32>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Run a diagnostic suite
    Diag {
        #[command(flatten)]
        target: DeviceArgs,

        #[arg(value_enum, value_name = "SUITE")]
        suite: SuiteKind,

        /// Permit suites that overwrite the tape
        #[arg(long)]
        allow_write: bool,

        /// Also save the report text to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Medium auxiliary memory attributes
    Mam {
        #[command(flatten)]
        target: DeviceArgs,

        #[command(subcommand)]
        action: MamCommand,
    },

    /// LTFS version, devices, mounts and kernel
    Status,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MamCommand {
    /// Cartridge summary from tapeinfo
    Summary,

    /// Read attributes (all of them unless --id is given)
    Read {
        /// Attribute identifier, hex (0x0401) or decimal
        #[arg(long, value_parser = parse_attribute_id)]
        id: Option<u16>,

        #[arg(short, long, default_value_t = 0)]
        partition: u8,
    },

    /// Write a host attribute (0x0800-0x0806)
    Write {
        #[arg(long, value_parser = parse_attribute_id)]
        id: u16,

        /// Text, or hex digits for binary attributes
        #[arg(long)]
        value: String,

        #[arg(short, long, default_value_t = 0)]
        partition: u8,
    },
}

pub fn parse_attribute_id(text: &str) -> Result<u16, String> {
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid attribute id '{}': {}", text, e))
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
