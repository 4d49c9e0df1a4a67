//! Test runner that replays canned outputs and records what was executed.

use super::{CommandLine, CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::sync::Mutex;

pub(crate) struct ScriptedRunner {
    rules: Vec<(String, CommandOutput)>,
    fallback: CommandOutput,
    history: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Unmatched commands succeed with empty output.
    pub(crate) fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: CommandOutput::success(""),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `output` to any command whose rendering equals `key` or
    /// starts with `key` followed by a space. The first matching rule wins.
    pub(crate) fn respond(mut self, key: &str, output: CommandOutput) -> Self {
        self.rules.push((key.to_string(), output));
        self
    }

    pub(crate) fn fallback(mut self, output: CommandOutput) -> Self {
        self.fallback = output;
        self
    }

    pub(crate) fn history(&self) -> Vec<String> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandLine) -> CommandOutput {
        let rendered = command.to_string();
        self.history.lock().unwrap().push(rendered.clone());

        self.rules
            .iter()
            .find(|(key, _)| {
                rendered == *key
                    || (rendered.starts_with(key.as_str())
                        && rendered[key.len()..].starts_with(' '))
            })
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}
