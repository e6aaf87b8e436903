//! External command execution
//!
//! Every tool the pipeline shells out to (package manager, autoreconf,
//! configure, make) goes through [`CommandRunner`] so the sequencing can be
//! exercised without the tools installed.

use crate::error::{PatchError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A fully described command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Extra variables layered over the inherited environment
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
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

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs commands on behalf of the patcher and recipe
pub trait CommandRunner {
    /// Run to completion. `Err` only when the process could not be started.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run and turn a non-zero exit into [`PatchError::CommandFailed`]
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(spec)?;
        if output.success() {
            Ok(output)
        } else {
            Err(PatchError::command_failed(
                spec.to_string(),
                output.status,
                output.stderr.trim(),
            ))
        }
    }
}

/// Runner backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&spec.env);

        log::debug!("Running command: {}", spec);

        let output = cmd
            .output()
            .map_err(|e| PatchError::command_spawn(spec.to_string(), e.to_string()))?;

        let result = CommandOutput {
            // Killed by a signal has no exit code
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        log::debug!("  exit status: {}", result.status);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_args() {
        let spec = CommandSpec::new("autoreconf").args(["--install", "--force"]);
        assert_eq!(spec.to_string(), "autoreconf --install --force");
    }

    #[test]
    fn test_envs_are_merged() {
        let mut env = BTreeMap::new();
        env.insert("CC".to_string(), "clang".to_string());
        let spec = CommandSpec::new("make").envs(&env).envs(&env);
        assert_eq!(spec.env.len(), 1);
        assert_eq!(spec.env["CC"], "clang");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let spec = CommandSpec::new("definitely-not-a-real-tool-4f1c");
        let err = SystemRunner.run(&spec).unwrap_err();
        assert!(matches!(err, PatchError::CommandSpawn { .. }));
    }
}
