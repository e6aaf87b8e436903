pub mod autotools;
pub mod build_integration;
pub mod buildozer;
pub mod command;
pub mod config;
pub mod error;
pub mod locator;
pub mod parallelism;
pub mod patch_system;
pub mod recipe;
pub mod targets;

pub use build_integration::{run_pipeline, PipelineReport};

pub use buildozer::BuildozerSpec;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};

pub use config::{LogLevel, PatchConfig};

pub use error::{BuildStage, PatchError, Result};

pub use patch_system::{apply_patch, disable_autogen, reconfigure, AutogenOutcome, PatchOutcome};

pub use recipe::{ArchContext, LibffiRecipe};
