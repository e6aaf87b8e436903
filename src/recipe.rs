//! Fallback libffi build recipe
//!
//! Used when no vendored libffi tree was found to patch. It runs the same
//! patch step inline and then drives the usual autotools sequence for a
//! single Android ABI:
//!
//! Patch → Reconfigure (best-effort) → Configure → Compile → Install

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{BuildStage, PatchError, Result};
use crate::parallelism::get_parallel_jobs;
use crate::patch_system;
use crate::targets;

pub const LIBFFI_VERSION: &str = "v3.4.2";
pub const LIBFFI_URL: &str = "https://github.com/libffi/libffi/archive/{version}.tar.gz";
pub const LIBFFI_LIBRARY: &str = "libffi.a";
/// Default install prefix, relative to the arch build directory
pub const INSTALL_SUBDIR: &str = "inst";

/// Static description of the dependency being built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibffiRecipe {
    pub version: String,
    /// Download URL template; `{version}` is substituted
    pub url: String,
    pub library: String,
    /// Install prefix below the arch build directory
    pub prefix_dir: String,
    #[serde(skip)]
    pub jobs: Option<usize>,
}

impl Default for LibffiRecipe {
    fn default() -> Self {
        Self {
            version: LIBFFI_VERSION.to_string(),
            url: LIBFFI_URL.to_string(),
            library: LIBFFI_LIBRARY.to_string(),
            prefix_dir: INSTALL_SUBDIR.to_string(),
            jobs: None,
        }
    }
}

/// Cross-compilation context for one ABI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchContext {
    pub abi: String,
    pub host_triple: String,
    /// Always absolute; configure rejects a relative `--prefix`
    pub build_dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl ArchContext {
    pub fn new(
        abi: impl Into<String>,
        host_triple: impl Into<String>,
        build_dir: impl Into<PathBuf>,
    ) -> Self {
        let build_dir = build_dir.into();
        let build_dir = std::path::absolute(&build_dir).unwrap_or(build_dir);

        Self {
            abi: abi.into(),
            host_triple: host_triple.into(),
            build_dir,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Build a context from the NDK clang toolchain layout
    pub fn for_arch(abi: &str, android_ndk: &Path, api: u32, build_dir: &Path) -> Result<Self> {
        let triple = targets::host_triple(abi).ok_or_else(|| PatchError::unsupported_arch(abi))?;
        let prefix = targets::clang_prefix(abi).ok_or_else(|| PatchError::unsupported_arch(abi))?;

        let toolchain_path = android_ndk
            .join("toolchains/llvm/prebuilt")
            .join(targets::ndk_host_tag())
            .join("bin");
        let tool = |name: &str| toolchain_path.join(name).to_string_lossy().into_owned();

        let cc = tool(&format!("{}{}-clang", prefix, api));
        let cxx = tool(&format!("{}{}-clang++", prefix, api));

        if !Path::new(&cc).exists() {
            log::warn!("Android CC not found at {}", cc);
        }

        Ok(Self::new(abi, triple, build_dir)
            .with_env("CC", cc)
            .with_env("CXX", cxx)
            .with_env("AR", tool("llvm-ar"))
            .with_env("RANLIB", tool("llvm-ranlib"))
            .with_env("CFLAGS", "-O2 -fPIC")
            .with_env("LDFLAGS", "-O2 -fPIC"))
    }
}

/// Locate the NDK from the usual environment variables
pub fn android_ndk_from_env() -> Result<PathBuf> {
    let ndk = std::env::var("NDK_HOME")
        .or_else(|_| std::env::var("ANDROID_NDK_HOME"))
        .or_else(|_| std::env::var("ANDROID_NDK_ROOT"))
        .map_err(|_| {
            PatchError::config_error(
                "NDK_HOME, ANDROID_NDK_HOME or ANDROID_NDK_ROOT environment variable must be set",
            )
        })?;

    let ndk = PathBuf::from(ndk);
    if !ndk.exists() {
        return Err(PatchError::config_error(format!(
            "Android NDK not found at {}",
            ndk.display()
        )));
    }
    Ok(ndk)
}

impl LibffiRecipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn download_url(&self) -> String {
        self.url.replace("{version}", &self.version)
    }

    pub fn install_prefix(&self, arch: &ArchContext) -> PathBuf {
        arch.build_dir.join(&self.prefix_dir)
    }

    /// Arguments passed to `./configure` for `arch`
    pub fn configure_args(&self, arch: &ArchContext) -> Vec<String> {
        vec![
            format!("--host={}", arch.host_triple),
            format!("--prefix={}", self.install_prefix(arch).display()),
            "--disable-shared".to_string(),
            "--enable-static".to_string(),
            "--with-pic".to_string(),
            "--disable-docs".to_string(),
            "--disable-multi-os-directory".to_string(),
        ]
    }

    /// Where `make install` is expected to put the library
    pub fn installed_library(&self, arch: &ArchContext) -> PathBuf {
        self.install_prefix(arch).join("lib").join(&self.library)
    }

    /// Commands for the Configure, Compile and Install stages
    pub fn stage_commands(&self, source_dir: &Path, arch: &ArchContext) -> Vec<(BuildStage, CommandSpec)> {
        let jobs = self.jobs.unwrap_or_else(get_parallel_jobs);

        vec![
            (
                BuildStage::Configure,
                CommandSpec::new("./configure")
                    .args(self.configure_args(arch))
                    .current_dir(source_dir)
                    .envs(&arch.env),
            ),
            (
                BuildStage::Compile,
                CommandSpec::new("make")
                    .arg(format!("-j{}", jobs))
                    .current_dir(source_dir)
                    .envs(&arch.env),
            ),
            (
                BuildStage::Install,
                CommandSpec::new("make")
                    .arg("install")
                    .current_dir(source_dir)
                    .envs(&arch.env),
            ),
        ]
    }

    /// Build libffi for one ABI from an already extracted source tree
    pub fn build_arch(
        &self,
        source_dir: &Path,
        arch: &ArchContext,
        runner: &dyn CommandRunner,
    ) -> Result<PathBuf> {
        log::info!(
            "Building libffi {} for {} ({})",
            self.version,
            arch.abi,
            arch.host_triple
        );

        let outcome = patch_system::apply_patch(source_dir)
            .map_err(|e| PatchError::stage_failed(BuildStage::Patch, e))?;
        log::debug!("configure.ac patch outcome: {:?}", outcome);

        if !patch_system::reconfigure(source_dir, runner) {
            log::warn!("Proceeding to configure without a fresh autoreconf");
        }

        for (stage, spec) in self.stage_commands(source_dir, arch) {
            log::info!("[{}] {}", stage, spec);
            runner
                .run_checked(&spec)
                .map_err(|e| PatchError::stage_failed(stage, e))?;
        }

        let library = self.installed_library(arch);
        if library.exists() {
            log::info!("Installed {}", library.display());
        } else {
            log::warn!("Expected library not found at {}", library.display());
        }

        Ok(library)
    }
}
