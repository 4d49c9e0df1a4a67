use super::device_arg;
use crate::runner::CommandLine;
use clap::Subcommand;
use std::fmt;
use std::path::Path;

/// Magnetic tape control operations understood by `mt -f <device>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum MtOperation {
    /// Show drive and tape status
    Status,
    /// Rewind to beginning of tape
    Rewind,
    /// Rewind and unload the cartridge
    Offline,
    /// Load the cartridge
    Load,
    /// Report the current block position
    Tell,
    /// Space forward over file marks
    Fsf {
        #[arg(value_name = "COUNT")]
        count: u32,
    },
    /// Space backward over file marks
    Bsf {
        #[arg(value_name = "COUNT")]
        count: u32,
    },
    /// Retension the tape
    Tension,
    /// Run a cleaning cycle
    Clean,
    /// Reset the drive
    Reset,
    /// Eject the cartridge (falls back to offline)
    Eject,
}

impl MtOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Rewind => "rewind",
            Self::Offline => "offline",
            Self::Load => "load",
            Self::Tell => "tell",
            Self::Fsf { .. } => "fsf",
            Self::Bsf { .. } => "bsf",
            Self::Tension => "tension",
            Self::Clean => "clean",
            Self::Reset => "reset",
            Self::Eject => "eject",
        }
    }

    pub fn command(&self, device: &Path) -> CommandLine {
        let command = CommandLine::new("mt")
            .arg("-f")
            .arg(device_arg(device))
            .arg(self.name());
        match self {
            Self::Fsf { count } | Self::Bsf { count } => command.arg(count.to_string()),
            _ => command,
        }
    }
}

impl fmt::Display for MtOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fsf { count } | Self::Bsf { count } => write!(f, "{} {}", self.name(), count),
            _ => f.write_str(self.name()),
        }
    }
}
