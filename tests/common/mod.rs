//! Shared helpers for the integration tests

#![allow(dead_code)]

use libffi_autopatch::command::{CommandOutput, CommandRunner, CommandSpec};
use libffi_autopatch::error::{PatchError, Result};
use std::cell::RefCell;

/// Records every command and answers from a fixed rule set instead of
/// spawning anything.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: RefCell<Vec<CommandSpec>>,
    /// Commands whose display string starts with one of these exit with 1
    pub failing: Vec<String>,
    /// Programs that behave as if not installed
    pub missing: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }

    pub fn missing(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());

        if self.missing.iter().any(|p| *p == spec.program) {
            return Err(PatchError::command_spawn(spec.to_string(), "not found"));
        }

        let line = spec.to_string();
        if self.failing.iter().any(|prefix| line.starts_with(prefix.as_str())) {
            return Ok(CommandOutput {
                status: 1,
                stdout: String::new(),
                stderr: format!("{} failed", spec.program),
            });
        }

        Ok(CommandOutput::default())
    }
}
