use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LtfsAdminError>;

#[derive(Error, Debug)]
pub enum LtfsAdminError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Permission denied on tape device {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Tape device busy: {}", .0.display())]
    DeviceBusy(PathBuf),

    #[error("No tape device available: {0}")]
    NoDeviceAvailable(String),

    #[error("Command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parameter validation error: {0}")]
    ParameterValidation(String),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl LtfsAdminError {
    pub fn no_device<T: Into<String>>(msg: T) -> Self {
        Self::NoDeviceAvailable(msg.into())
    }

    pub fn command_failed<C: Into<String>, E: Into<String>>(command: C, stderr: E) -> Self {
        Self::CommandFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn parse<T: Into<String>>(msg: T) -> Self {
        Self::Parse(msg.into())
    }

    pub fn parameter_validation<T: Into<String>>(msg: T) -> Self {
        Self::ParameterValidation(msg.into())
    }
}

impl From<toml::de::Error> for LtfsAdminError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
