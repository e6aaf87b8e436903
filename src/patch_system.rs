use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::command::{CommandRunner, CommandSpec};
use crate::error::Result;

/// Directive prepended to configure.ac. It doubles as the marker for
/// "already patched".
pub const PATCH_DIRECTIVE: &str = "m4_pattern_allow([LT_SYS_SYMBOL_USCORE])";

pub const CONFIGURE_AC: &str = "configure.ac";
pub const AUTOGEN_SH: &str = "autogen.sh";
pub const AUTOGEN_BACKUP: &str = "autogen.sh.orig";

pub const AUTORECONF_ARGS: &[&str] = &["--install", "--force"];

const AUTOGEN_REPLACEMENT: &str = "#!/bin/sh\n\
# autogen.sh replaced by patch_libffi\n\
exec autoreconf --install --force \"$@\"\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOutcome {
    Applied,
    AlreadyPatched,
    /// No directory or no configure.ac
    NothingToPatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutogenOutcome {
    Missing,
    Replaced,
    AlreadyReplaced,
}

/// Returns `content` with the directive prepended, or `None` when the
/// marker is already present.
pub fn patch_content(content: &str) -> Option<String> {
    if content.contains(PATCH_DIRECTIVE) {
        return None;
    }

    let mut patched = String::with_capacity(PATCH_DIRECTIVE.len() + 1 + content.len());
    patched.push_str(PATCH_DIRECTIVE);
    patched.push('\n');
    patched.push_str(content);
    Some(patched)
}

/// Patch `configure.ac` in `source_dir` so autoconf tolerates the
/// `LT_SYS_SYMBOL_USCORE` macro.
pub fn apply_patch(source_dir: &Path) -> Result<PatchOutcome> {
    if !source_dir.is_dir() {
        log::debug!("{} is not a directory, nothing to patch", source_dir.display());
        return Ok(PatchOutcome::NothingToPatch);
    }

    let configure_ac = source_dir.join(CONFIGURE_AC);
    let content = match fs::read_to_string(&configure_ac) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No {} in {}, nothing to patch", CONFIGURE_AC, source_dir.display());
            return Ok(PatchOutcome::NothingToPatch);
        }
        Err(e) => return Err(e.into()),
    };

    match patch_content(&content) {
        Some(patched) => {
            fs::write(&configure_ac, patched)?;
            log::info!("Patched {}", configure_ac.display());
            Ok(PatchOutcome::Applied)
        }
        None => {
            log::info!("{} already patched", configure_ac.display());
            Ok(PatchOutcome::AlreadyPatched)
        }
    }
}

/// Move the bundled `autogen.sh` aside and replace it with a plain
/// `autoreconf` call.
pub fn disable_autogen(source_dir: &Path) -> Result<AutogenOutcome> {
    if !source_dir.is_dir() {
        return Ok(AutogenOutcome::Missing);
    }

    let autogen = source_dir.join(AUTOGEN_SH);
    let current = match fs::read_to_string(&autogen) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AutogenOutcome::Missing),
        Err(e) => return Err(e.into()),
    };

    if current == AUTOGEN_REPLACEMENT {
        return Ok(AutogenOutcome::AlreadyReplaced);
    }

    let backup = source_dir.join(AUTOGEN_BACKUP);
    if backup.exists() {
        // A backup from an earlier run is the real original; drop this copy.
        fs::remove_file(&autogen)?;
    } else {
        fs::rename(&autogen, &backup)?;
    }

    fs::write(&autogen, AUTOGEN_REPLACEMENT)?;
    make_executable(&autogen)?;

    log::info!(
        "Replaced {} (original kept as {})",
        autogen.display(),
        backup.display()
    );
    Ok(AutogenOutcome::Replaced)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

pub fn autoreconf_command(source_dir: &Path) -> CommandSpec {
    CommandSpec::new("autoreconf")
        .args(AUTORECONF_ARGS.iter().copied())
        .current_dir(source_dir)
}

/// Run `autoreconf --install --force` in `source_dir`. Failures are logged
/// and reported as `false`; they never abort.
pub fn reconfigure(source_dir: &Path, runner: &dyn CommandRunner) -> bool {
    let spec = autoreconf_command(source_dir);

    match runner.run_checked(&spec) {
        Ok(_) => {
            log::info!("autoreconf succeeded in {}", source_dir.display());
            true
        }
        Err(e) => {
            log::warn!(
                "autoreconf failed in {}, continuing anyway: {}",
                source_dir.display(),
                e
            );
            false
        }
    }
}

/// Hex SHA-256 of a file, `None` if it cannot be read
pub fn fingerprint(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    Some(hex::encode(Sha256::digest(&bytes)))
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TreePatchResult {
    pub source_dir: PathBuf,
    pub outcome: Option<PatchOutcome>,
    pub autogen: Option<AutogenOutcome>,
    pub reconfigured: bool,
    pub configure_ac_sha256: Option<String>,
    pub warnings: Vec<String>,
}

/// Patch, replace autogen.sh and reconfigure a single source tree.
/// Nothing here aborts; problems are collected as warnings.
pub fn patch_tree(source_dir: &Path, runner: &dyn CommandRunner) -> TreePatchResult {
    let mut warnings = Vec::new();

    let outcome = match apply_patch(source_dir) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            log::warn!("Could not patch {}: {}", source_dir.display(), e);
            warnings.push(format!("configure.ac: {}", e));
            None
        }
    };

    let autogen = match disable_autogen(source_dir) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            log::warn!("Could not replace autogen.sh in {}: {}", source_dir.display(), e);
            warnings.push(format!("autogen.sh: {}", e));
            None
        }
    };

    let reconfigured = if outcome == Some(PatchOutcome::NothingToPatch) {
        false
    } else {
        reconfigure(source_dir, runner)
    };
    if !reconfigured && outcome != Some(PatchOutcome::NothingToPatch) {
        warnings.push("autoreconf failed".to_string());
    }

    TreePatchResult {
        source_dir: source_dir.to_path_buf(),
        outcome,
        autogen,
        reconfigured,
        configure_ac_sha256: fingerprint(&source_dir.join(CONFIGURE_AC)),
        warnings,
    }
}
