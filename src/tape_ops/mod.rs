//! Tape Operations
//!
//! High-level drive operations layered on the [`CommandRunner`]: drive
//! control through `mt`, LTFS mount/unmount, mkltfs formatting, diagnostic
//! suites and MAM attribute access.

pub mod diagnostics;
pub mod format;
pub mod mam;
pub mod mount;
pub mod mt;
pub mod status;

pub use diagnostics::{DiagnosticStep, DiagnosticSuite, StepResult, SuiteKind, SuiteReport};
pub use format::FormatRequest;
pub use mam::{MamAttribute, MamAttributeFormat, MamWrite};
pub use mount::{LtfsMount, MountRecord, MountRequest, MountTable};
pub use mt::MtOperation;
pub use status::SystemStatus;

use crate::config::Config;
use crate::runner::{run_until_success, Attempts, CommandOutput, CommandRunner};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Cheap to clone; each background worker gets its own handle.
#[derive(Clone)]
pub struct TapeOperations {
    pub(crate) runner: Arc<dyn CommandRunner>,
    pub(crate) config: Config,
}

impl TapeOperations {
    pub fn new(runner: Arc<dyn CommandRunner>, config: Config) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a single `mt` operation. `eject` goes through [`Self::eject`].
    pub async fn mt(&self, device: &Path, operation: MtOperation) -> CommandOutput {
        if operation == MtOperation::Eject {
            return self.eject(device).await.output;
        }
        info!("mt {} on {}", operation, device.display());
        self.runner.run(&operation.command(device)).await
    }

    /// `mt eject`, falling back to `mt offline` for drives without eject
    pub async fn eject(&self, device: &Path) -> Attempts {
        info!("Ejecting tape from {}", device.display());
        let attempts = run_until_success(
            self.runner.as_ref(),
            [
                MtOperation::Eject.command(device),
                MtOperation::Offline.command(device),
            ],
        )
        .await;
        if !attempts.succeeded() {
            warn!("Eject failed on {}", device.display());
        }
        attempts
    }

    /// `mt status` output, or the error text when the drive does not answer
    pub async fn tape_info(&self, device: &Path) -> String {
        let output = self.mt(device, MtOperation::Status).await;
        if output.succeeded {
            output.stdout
        } else {
            format!("Error: {}", output.stderr)
        }
    }
}

pub(crate) fn device_arg(device: &Path) -> String {
    device.to_string_lossy().into_owned()
}

#[cfg(test)]
pub(crate) fn test_operations(runner: Arc<dyn CommandRunner>) -> TapeOperations {
    let mut config = Config::default();
    config.diagnostics.load_settle_secs = 0;
    TapeOperations::new(runner, config)
}
