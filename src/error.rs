//! Error handling for libffi-autopatch
//!
//! Most steps of the patch pipeline are best-effort and only log their
//! failures. The errors defined here are what the fallible building blocks
//! return before the pipeline decides whether to downgrade them.

use std::fmt;
use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PatchError>;

/// Stages of the fallback recipe build, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStage {
    Patch,
    Reconfigure,
    Configure,
    Compile,
    Install,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStage::Patch => write!(f, "patch"),
            BuildStage::Reconfigure => write!(f, "reconfigure"),
            BuildStage::Configure => write!(f, "configure"),
            BuildStage::Compile => write!(f, "compile"),
            BuildStage::Install => write!(f, "install"),
        }
    }
}

/// Error types produced by the patcher, locator, recipe and spec editor
#[derive(Error, Debug)]
pub enum PatchError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Android ABI with no known host triple
    #[error("Unsupported architecture: {arch}")]
    UnsupportedArch { arch: String },

    /// An external command could not be started
    #[error("Failed to run `{command}`: {message}")]
    CommandSpawn { command: String, message: String },

    /// An external command exited unsuccessfully
    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// A recipe stage failed and aborted the build
    #[error("Build stage {stage} failed: {message}")]
    StageFailed { stage: BuildStage, message: String },

    /// Malformed buildozer.spec line
    #[error("Invalid buildozer.spec at line {line}: {message}")]
    SpecFormat { line: usize, message: String },
}

impl PatchError {
    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        PatchError::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new unsupported architecture error
    pub fn unsupported_arch(arch: impl Into<String>) -> Self {
        PatchError::UnsupportedArch { arch: arch.into() }
    }

    /// Create a new command spawn error
    pub fn command_spawn(command: impl Into<String>, message: impl Into<String>) -> Self {
        PatchError::CommandSpawn {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a new command failure error
    pub fn command_failed(command: impl Into<String>, status: i32, stderr: impl Into<String>) -> Self {
        PatchError::CommandFailed {
            command: command.into(),
            status,
            stderr: stderr.into(),
        }
    }

    /// Wrap any error as the failure of a build stage
    pub fn stage_failed(stage: BuildStage, message: impl fmt::Display) -> Self {
        PatchError::StageFailed {
            stage,
            message: message.to_string(),
        }
    }

    /// Create a new buildozer.spec format error
    pub fn spec_format(line: usize, message: impl Into<String>) -> Self {
        PatchError::SpecFormat {
            line,
            message: message.into(),
        }
    }

    /// The stage this error aborted, if it came from the recipe
    pub fn stage(&self) -> Option<BuildStage> {
        match self {
            PatchError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PatchError::unsupported_arch("mips");
        assert!(matches!(err, PatchError::UnsupportedArch { .. }));

        let err = PatchError::stage_failed(BuildStage::Configure, "boom");
        assert_eq!(err.stage(), Some(BuildStage::Configure));

        let err = PatchError::config_error("bad");
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_error_display() {
        let err = PatchError::command_failed("make install", 2, "no rule");
        assert_eq!(
            err.to_string(),
            "`make install` exited with status 2: no rule"
        );

        let err = PatchError::stage_failed(BuildStage::Compile, "make exploded");
        assert_eq!(err.to_string(), "Build stage compile failed: make exploded");
    }
}
