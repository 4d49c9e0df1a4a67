use super::{device_arg, TapeOperations};
use crate::error::{LtfsAdminError, Result};
use crate::runner::{CommandLine, CommandOutput};
use std::path::PathBuf;
use tracing::info;

const MIN_BLOCK_SIZE: u32 = 512;
const MAX_BLOCK_SIZE: u32 = 2_097_152;

/// Parameters for `mkltfs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRequest {
    pub device: PathBuf,
    pub label: Option<String>,
    pub force: bool,
    /// Explicit block size; when absent the drive vendor decides
    pub block_size: Option<u32>,
}

impl FormatRequest {
    pub fn new<P: Into<PathBuf>>(device: P) -> Self {
        Self {
            device: device.into(),
            label: None,
            force: false,
            block_size: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(size) = self.block_size {
            if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&size) {
                return Err(LtfsAdminError::parameter_validation(format!(
                    "Block size must be between {} and {}, got {}",
                    MIN_BLOCK_SIZE, MAX_BLOCK_SIZE, size
                )));
            }
        }
        Ok(())
    }

    /// `mkltfs -d <device> [-n <label>] [-f] [-b <blocksize>]`
    pub fn command(&self) -> CommandLine {
        let mut command = CommandLine::new("mkltfs")
            .arg("-d")
            .arg(device_arg(&self.device));
        if let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) {
            command = command.arg("-n").arg(label);
        }
        if self.force {
            command = command.arg("-f");
        }
        if let Some(size) = self.block_size {
            command = command.arg("-b").arg(size.to_string());
        }
        command
    }
}

impl TapeOperations {
    /// Format with LTFS. Quantum drives get a smaller block size unless one
    /// was requested explicitly. A failure is reported as-is, never retried.
    pub async fn format(&self, request: &FormatRequest) -> Result<CommandOutput> {
        request.validate()?;

        let mut request = request.clone();
        if request.block_size.is_none() && self.is_quantum_drive(&request.device).await {
            let size = self.config.format.quantum_block_size;
            info!("Detected Quantum LTO drive, using {} byte blocks", size);
            request.block_size = Some(size);
        }

        info!("Formatting {} with LTFS", request.device.display());
        Ok(self.runner.run(&request.command()).await)
    }

    async fn is_quantum_drive(&self, device: &std::path::Path) -> bool {
        let inquiry = self
            .runner
            .run(&CommandLine::new("sg_inq").arg(device_arg(device)))
            .await;
        inquiry.succeeded && inquiry.stdout.to_uppercase().contains("QUANTUM")
    }
}
