//! External Command Runner
//!
//! Every tape operation goes through a [`CommandRunner`]. Commands are
//! structured argument vectors handed straight to the process-spawn API, so
//! device paths, labels and mount points are never interpreted by a shell.

use crate::error::{LtfsAdminError, Result};
use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

#[cfg(test)]
pub(crate) mod scripted;

/// A program plus its arguments, optionally bounded by a timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl CommandLine {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Shell-quoted rendering, for logs and diagnostics output only
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=,:@%+".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Captured result of one command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success<S: Into<String>>(stdout: S) -> Self {
        Self {
            succeeded: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failure<S: Into<String>>(stderr: S) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: None,
        }
    }

    /// Convert a failed execution into `CommandFailed` with stderr verbatim
    pub fn into_result(self, command: &CommandLine) -> Result<Self> {
        if self.succeeded {
            Ok(self)
        } else {
            Err(LtfsAdminError::command_failed(
                command.to_string(),
                self.stderr.clone(),
            ))
        }
    }

    /// The drive refused the command with EBUSY, usually another process holds it
    pub fn reports_busy(&self) -> bool {
        !self.succeeded && self.stderr.contains("Device or resource busy")
    }

    /// stderr when present, otherwise a generic message
    pub fn error_message(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            "Unknown error occurred"
        } else {
            stderr
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. Never fails: launch errors and timeouts come back
    /// as an unsuccessful [`CommandOutput`].
    async fn run(&self, command: &CommandLine) -> CommandOutput;
}

/// Runs commands as child processes via tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandLine) -> CommandOutput {
        debug!("Running: {}", command);

        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let result = match command.timeout {
            Some(limit) => match tokio::time::timeout(limit, child).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("{} timed out after {:?}", command, limit);
                    return CommandOutput::failure(format!(
                        "{} timed out after {:?}",
                        command.program, limit
                    ));
                }
            },
            None => child.await,
        };

        match result {
            Ok(output) => {
                let out = CommandOutput {
                    succeeded: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code(),
                };
                debug!("{} exited with {:?}", command.program, out.exit_code);
                out
            }
            Err(e) => {
                debug!("Failed to launch {}: {}", command.program, e);
                CommandOutput::failure(e.to_string())
            }
        }
    }
}

/// Outcome of a retry chain
#[derive(Debug, Clone)]
pub struct Attempts {
    /// Command lines actually executed, in order
    pub attempted: Vec<CommandLine>,
    /// Output of the last executed command
    pub output: CommandOutput,
}

impl Attempts {
    pub fn succeeded(&self) -> bool {
        self.output.succeeded
    }
}

/// Try each command in order until one succeeds.
pub async fn run_until_success<R, I>(runner: &R, commands: I) -> Attempts
where
    R: CommandRunner + ?Sized,
    I: IntoIterator<Item = CommandLine>,
{
    let mut attempted = Vec::new();
    let mut output = CommandOutput::failure("no command variants to try");

    for command in commands {
        output = runner.run(&command).await;
        let succeeded = output.succeeded;
        if !succeeded {
            warn!("Attempt failed: {}: {}", command, output.error_message());
        }
        attempted.push(command);
        if succeeded {
            break;
        }
    }

    Attempts { attempted, output }
}
