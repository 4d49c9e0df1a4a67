//! Drive Diagnostics
//!
//! Each suite is a declarative list of steps. A step runs one external
//! command (or pauses), and is either required, in which case a failure
//! ends the suite, or optional, in which case the failure is recorded and
//! the suite moves on. Nothing is retried.
//!
//! Reports render as plain text and can be saved to a file as such.

use super::{device_arg, MtOperation, TapeOperations};
use crate::config::DiagnosticsConfig;
use crate::error::{LtfsAdminError, Result};
use crate::runner::{CommandLine, CommandOutput};
use crate::utils::format_duration;
use chrono::{DateTime, Local};
use clap::ValueEnum;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuiteKind {
    /// mt status
    DriveStatus,
    /// mt status, TapeAlert flags, capacity
    TapeStatus,
    /// Current block position
    Position,
    /// SCSI inquiry and serial number
    Hardware,
    /// Unload / load cycle
    LoadTest,
    /// Spacing forward and backward
    SeekTest,
    /// Drive log pages
    LogPages,
    /// Error counters and TapeAlert log
    ErrorStats,
    /// Firmware and VPD pages
    Firmware,
    /// Write a pattern, read it back, compare (destroys tape contents)
    ReadWrite,
    /// Hardware through seek test; adds read/write with --allow-write
    Full,
}

impl SuiteKind {
    pub fn writes_to_tape(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Run(CommandLine),
    Pause(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticStep {
    pub name: String,
    pub action: StepAction,
    pub required: bool,
    /// Keep only stdout lines containing this text (case-insensitive); no
    /// matching line fails the step.
    pub line_filter: Option<&'static str>,
}

impl DiagnosticStep {
    fn required<S: Into<String>>(name: S, command: CommandLine) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Run(command),
            required: true,
            line_filter: None,
        }
    }

    fn optional<S: Into<String>>(name: S, command: CommandLine) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Run(command),
            required: false,
            line_filter: None,
        }
    }

    fn pause<S: Into<String>>(name: S, duration: Duration) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Pause(duration),
            required: false,
            line_filter: None,
        }
    }

    fn keep_lines(mut self, pattern: &'static str) -> Self {
        self.line_filter = Some(pattern);
        self
    }
}

#[derive(Debug, Clone)]
pub struct DiagnosticSuite {
    pub title: String,
    pub steps: Vec<DiagnosticStep>,
}

fn mt(device: &Path, operation: MtOperation) -> CommandLine {
    operation.command(device)
}

fn tool(program: &str, args: &[&str], device: &Path) -> CommandLine {
    CommandLine::new(program)
        .args(args.iter().copied())
        .arg(device_arg(device))
}

impl DiagnosticSuite {
    pub fn drive_status(device: &Path) -> Self {
        Self {
            title: "Drive Status".into(),
            steps: vec![DiagnosticStep::required(
                "Drive status",
                mt(device, MtOperation::Status),
            )],
        }
    }

    pub fn tape_status(device: &Path) -> Self {
        Self {
            title: "Tape Status".into(),
            steps: vec![
                DiagnosticStep::optional("Basic Status", mt(device, MtOperation::Status)),
                DiagnosticStep::optional("Tape Alert Flags", tool("tapeinfo", &["-f"], device)),
                DiagnosticStep::optional("Block Limits", tool("sg_readcap", &[], device)),
            ],
        }
    }

    pub fn position(device: &Path) -> Self {
        Self {
            title: "Tape Position".into(),
            steps: vec![DiagnosticStep::required(
                "Current position",
                mt(device, MtOperation::Tell),
            )],
        }
    }

    pub fn hardware(device: &Path) -> Self {
        Self {
            title: "Hardware Information".into(),
            steps: vec![
                DiagnosticStep::optional("SCSI Inquiry", tool("sg_inq", &[], device)),
                DiagnosticStep::optional("Drive Serial", tool("sg_vpd", &["-p", "sn"], device)),
                DiagnosticStep::optional("Device Info", CommandLine::new("lsscsi"))
                    .keep_lines("tape"),
            ],
        }
    }

    pub fn load_test(device: &Path, settle: Duration) -> Self {
        Self {
            title: "Load/Unload Test".into(),
            steps: vec![
                DiagnosticStep::required("Unload tape", mt(device, MtOperation::Offline)),
                DiagnosticStep::pause(
                    format!("Wait {}", format_duration(settle.as_secs_f64())),
                    settle,
                ),
                DiagnosticStep::required("Load tape", mt(device, MtOperation::Load)),
                DiagnosticStep::required("Check status", mt(device, MtOperation::Status)),
            ],
        }
    }

    pub fn seek_test(device: &Path) -> Self {
        Self {
            title: "Seek Test".into(),
            steps: vec![
                DiagnosticStep::optional("Rewind to beginning", mt(device, MtOperation::Rewind)),
                DiagnosticStep::optional(
                    "Seek forward 1000 file marks",
                    mt(device, MtOperation::Fsf { count: 1000 }),
                ),
                DiagnosticStep::optional("Check position", mt(device, MtOperation::Tell)),
                DiagnosticStep::optional(
                    "Seek backward 500 file marks",
                    mt(device, MtOperation::Bsf { count: 500 }),
                ),
                DiagnosticStep::optional("Check position", mt(device, MtOperation::Tell)),
                DiagnosticStep::optional("Return to beginning", mt(device, MtOperation::Rewind)),
            ],
        }
    }

    pub fn log_pages(device: &Path, pages: &[String]) -> Self {
        Self {
            title: "Drive Log Pages".into(),
            steps: pages
                .iter()
                .map(|page| {
                    DiagnosticStep::optional(
                        format!("Log Page {}", page),
                        tool("sg_logs", &["-p", page.as_str()], device),
                    )
                })
                .collect(),
        }
    }

    pub fn error_stats(device: &Path) -> Self {
        Self {
            title: "Error Statistics".into(),
            steps: vec![
                DiagnosticStep::optional(
                    "Error Counter Log",
                    tool("sg_logs", &["-p", "0x03"], device),
                ),
                DiagnosticStep::optional(
                    "TapeAlert Flags",
                    tool("sg_logs", &["-p", "0x2e"], device),
                ),
                DiagnosticStep::optional("Device Statistics", tool("iostat", &["-x"], device)),
            ],
        }
    }

    pub fn firmware(device: &Path) -> Self {
        Self {
            title: "Firmware Information".into(),
            steps: vec![
                DiagnosticStep::optional(
                    "Device Identification",
                    tool("sg_inq", &["-p", "0x83"], device),
                ),
                DiagnosticStep::optional(
                    "Unit Serial Number",
                    tool("sg_inq", &["-p", "0x80"], device),
                ),
                DiagnosticStep::optional(
                    "Software Interface ID",
                    tool("sg_inq", &["-p", "0x84"], device),
                ),
                DiagnosticStep::optional(
                    "Management Network Addresses",
                    tool("sg_inq", &["-p", "0x85"], device),
                ),
            ],
        }
    }

    /// `scratch` must outlive the suite run; pattern and readback files live there.
    pub fn read_write(device: &Path, scratch: &Path, megabytes: u32) -> Self {
        let pattern = scratch.join("tape_test_data");
        let readback = scratch.join("tape_read_test");
        let dev = device_arg(device);

        Self {
            title: "Read/Write Test".into(),
            steps: vec![
                DiagnosticStep::required(
                    "Create test data",
                    CommandLine::new("dd").args([
                        "if=/dev/urandom".to_string(),
                        format!("of={}", pattern.display()),
                        "bs=1M".to_string(),
                        format!("count={}", megabytes),
                    ]),
                ),
                DiagnosticStep::required(
                    "Write to tape",
                    CommandLine::new("dd").args([
                        format!("if={}", pattern.display()),
                        format!("of={}", dev),
                        "bs=1M".to_string(),
                    ]),
                ),
                DiagnosticStep::optional("Rewind tape", mt(device, MtOperation::Rewind)),
                DiagnosticStep::required(
                    "Read from tape",
                    CommandLine::new("dd").args([
                        format!("if={}", dev),
                        format!("of={}", readback.display()),
                        "bs=1M".to_string(),
                        format!("count={}", megabytes),
                    ]),
                ),
                DiagnosticStep::required(
                    "Verify data",
                    CommandLine::new("cmp").args([
                        pattern.display().to_string(),
                        readback.display().to_string(),
                    ]),
                ),
            ],
        }
    }

    /// Suites making up `kind`; `scratch` is only consulted for read/write.
    pub fn for_kind(
        kind: SuiteKind,
        device: &Path,
        config: &DiagnosticsConfig,
        scratch: Option<&Path>,
    ) -> Vec<Self> {
        let settle = Duration::from_secs(config.load_settle_secs);
        let mut suites = match kind {
            SuiteKind::DriveStatus => vec![Self::drive_status(device)],
            SuiteKind::TapeStatus => vec![Self::tape_status(device)],
            SuiteKind::Position => vec![Self::position(device)],
            SuiteKind::Hardware => vec![Self::hardware(device)],
            SuiteKind::LoadTest => vec![Self::load_test(device, settle)],
            SuiteKind::SeekTest => vec![Self::seek_test(device)],
            SuiteKind::LogPages => vec![Self::log_pages(device, &config.log_pages)],
            SuiteKind::ErrorStats => vec![Self::error_stats(device)],
            SuiteKind::Firmware => vec![Self::firmware(device)],
            SuiteKind::ReadWrite => Vec::new(),
            SuiteKind::Full => vec![
                Self::hardware(device),
                Self::drive_status(device),
                Self::tape_status(device),
                Self::position(device),
                Self::load_test(device, settle),
                Self::seek_test(device),
            ],
        };
        if matches!(kind, SuiteKind::ReadWrite | SuiteKind::Full) {
            if let Some(dir) = scratch {
                suites.push(Self::read_write(device, dir, config.rw_test_megabytes));
            }
        }
        suites
    }
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    pub command: Option<String>,
    pub output: Option<CommandOutput>,
    pub required: bool,
    pub elapsed: Duration,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.output.as_ref().map(|o| o.succeeded).unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub title: String,
    pub device: PathBuf,
    pub started_at: DateTime<Local>,
    pub steps: Vec<StepResult>,
    /// false when a required step failed and the rest were skipped
    pub completed: bool,
}

impl SuiteReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed()).count()
    }

    pub fn render(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "=== {} - {} ===", self.title, self.device.display());
        let _ = writeln!(text, "Started: {}", self.started_at.format("%Y-%m-%d %H:%M:%S"));

        for step in &self.steps {
            let _ = writeln!(text, "{}...", step.name);
            match &step.output {
                None => {
                    let _ = writeln!(text, "✓ Done");
                }
                Some(out) if out.succeeded => {
                    if out.stdout.trim().is_empty() {
                        let elapsed = format_duration(step.elapsed.as_secs_f64());
                        let _ = writeln!(text, "✓ Success ({})", elapsed);
                    } else {
                        let _ = writeln!(text, "{}", out.stdout.trim_end());
                    }
                }
                Some(out) => {
                    let _ = writeln!(text, "✗ Error: {}", out.error_message());
                }
            }
        }

        if !self.completed {
            let _ = writeln!(text, "Suite aborted after a required step failed");
        }
        text
    }
}

/// Write the rendered text of every report to `path`, replacing its contents
pub fn save_reports(path: &Path, reports: &[SuiteReport]) -> Result<()> {
    let text = reports
        .iter()
        .map(SuiteReport::render)
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(path, text)?;
    info!("Diagnostics saved to {}", path.display());
    Ok(())
}

/// Narrow stdout to lines mentioning `pattern`, failing when none do
fn filter_lines(mut output: CommandOutput, pattern: &str) -> CommandOutput {
    if !output.succeeded {
        return output;
    }
    let needle = pattern.to_lowercase();
    let kept: Vec<&str> = output
        .stdout
        .lines()
        .filter(|line| line.to_lowercase().contains(&needle))
        .collect();
    if kept.is_empty() {
        output.succeeded = false;
        output.stderr = format!("no line mentions '{}'", pattern);
    }
    output.stdout = kept.join("\n");
    output
}

impl TapeOperations {
    pub async fn run_suite(&self, suite: &DiagnosticSuite, device: &Path) -> SuiteReport {
        info!("Running {} on {}", suite.title, device.display());
        let started_at = Local::now();
        let mut steps = Vec::with_capacity(suite.steps.len());
        let mut completed = true;

        for step in &suite.steps {
            let started = Instant::now();
            let (command, output) = match &step.action {
                StepAction::Run(command) => {
                    let mut output = self.runner.run(command).await;
                    if let Some(pattern) = step.line_filter {
                        output = filter_lines(output, pattern);
                    }
                    (Some(command.to_string()), Some(output))
                }
                StepAction::Pause(duration) => {
                    tokio::time::sleep(*duration).await;
                    (None, None)
                }
            };

            let result = StepResult {
                name: step.name.clone(),
                command,
                output,
                required: step.required,
                elapsed: started.elapsed(),
            };
            let failed = !result.passed();
            steps.push(result);

            if failed {
                if step.required {
                    warn!("{}: required step '{}' failed", suite.title, step.name);
                    completed = false;
                    break;
                }
                debug!("{}: optional step '{}' failed", suite.title, step.name);
            }
        }

        SuiteReport {
            title: suite.title.clone(),
            device: device.to_path_buf(),
            started_at,
            steps,
            completed,
        }
    }

    /// Run the suites for `kind` in order. Writing to tape needs `allow_write`.
    pub async fn run_diagnostics(
        &self,
        kind: SuiteKind,
        device: &Path,
        allow_write: bool,
    ) -> Result<Vec<SuiteReport>> {
        if kind.writes_to_tape() && !allow_write {
            return Err(LtfsAdminError::parameter_validation(
                "the read/write test overwrites tape contents; pass --allow-write to run it",
            ));
        }

        let scratch = if allow_write && matches!(kind, SuiteKind::ReadWrite | SuiteKind::Full) {
            Some(tempfile::tempdir()?)
        } else {
            None
        };

        let suites = DiagnosticSuite::for_kind(
            kind,
            device,
            &self.config.diagnostics,
            scratch.as_ref().map(|d| d.path()),
        );

        let mut reports = Vec::with_capacity(suites.len());
        for suite in &suites {
            reports.push(self.run_suite(suite, device).await);
        }
        Ok(reports)
    }
}
