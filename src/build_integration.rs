//! Build System Integration
//!
//! The one-shot pipeline run before a Buildozer / python-for-android build:
//! install autotools, find vendored libffi trees, patch them. Every step is
//! best-effort; problems end up as warnings in the report.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::autotools;
use crate::command::CommandRunner;
use crate::config::PatchConfig;
use crate::locator;
use crate::patch_system::{self, PatchOutcome, TreePatchResult};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    /// `None` when installation was skipped
    pub dependencies_installed: Option<bool>,
    pub missing_tools: Vec<String>,
    pub trees: Vec<TreePatchResult>,
    /// No tree was patched (now or earlier), so the fallback recipe has to
    /// build libffi
    pub fallback_recipe_required: bool,
}

impl PipelineReport {
    pub fn patched_count(&self) -> usize {
        self.trees
            .iter()
            .filter(|t| t.outcome == Some(PatchOutcome::Applied))
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.trees.iter().map(|t| t.warnings.len()).sum::<usize>()
            + usize::from(self.dependencies_installed == Some(false))
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Source trees to patch: explicit ones first, then whatever the search finds
pub fn collect_source_dirs(config: &PatchConfig) -> Vec<PathBuf> {
    let mut dirs = config.source_dirs.clone();
    for found in locator::locate_sources(&config.all_search_roots(), config.max_depth) {
        if !dirs.contains(&found) {
            dirs.push(found);
        }
    }
    dirs
}

pub fn run_pipeline(config: &PatchConfig, runner: &dyn CommandRunner) -> PipelineReport {
    let started_at = Utc::now();

    let dependencies_installed = if config.install_dependencies {
        Some(autotools::install_dependencies(
            &config.installer,
            &config.packages,
            runner,
        ))
    } else {
        log::info!("Skipping dependency installation");
        None
    };

    let missing_tools = autotools::missing_tools(runner);
    if !missing_tools.is_empty() {
        log::warn!("Missing build tools: {}", missing_tools.join(", "));
    }

    let source_dirs = collect_source_dirs(config);
    let trees: Vec<TreePatchResult> = source_dirs
        .iter()
        .map(|dir| {
            log::info!("Patching libffi tree {}", dir.display());
            patch_system::patch_tree(dir, runner)
        })
        .collect();

    let fallback_recipe_required = !trees.iter().any(|t| {
        matches!(
            t.outcome,
            Some(PatchOutcome::Applied | PatchOutcome::AlreadyPatched)
        )
    });
    if fallback_recipe_required {
        log::info!("No patchable libffi source found, the local recipe will build it");
    }

    let report = PipelineReport {
        started_at,
        dependencies_installed,
        missing_tools,
        trees,
        fallback_recipe_required,
    };

    log::info!(
        "Patch pipeline finished: {} tree(s), {} patched, {} warning(s)",
        report.trees.len(),
        report.patched_count(),
        report.warning_count()
    );
    report
}
