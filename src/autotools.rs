//! Autotools prerequisites: probing and best-effort installation

use crate::command::{CommandRunner, CommandSpec};

/// Tools the reconfigure/configure steps need on `PATH`
pub const REQUIRED_TOOLS: &[&str] = &["autoconf", "automake", "libtoolize", "m4", "make"];

pub const DEFAULT_PACKAGES: &[&str] = &[
    "autoconf",
    "automake",
    "libtool",
    "libltdl-dev",
    "m4",
    "pkg-config",
];

pub const DEFAULT_INSTALLER: &[&str] = &["sudo", "apt-get", "install", "-y"];

/// Tools from [`REQUIRED_TOOLS`] that do not answer `--version`
pub fn missing_tools(runner: &dyn CommandRunner) -> Vec<String> {
    REQUIRED_TOOLS
        .iter()
        .filter(|tool| {
            let probe = CommandSpec::new(**tool).arg("--version");
            !matches!(runner.run(&probe), Ok(output) if output.success())
        })
        .map(|tool| tool.to_string())
        .collect()
}

pub fn install_command(installer: &[String], packages: &[String]) -> Option<CommandSpec> {
    let (program, rest) = installer.split_first()?;
    Some(
        CommandSpec::new(program.as_str())
            .args(rest.iter().cloned())
            .args(packages.iter().cloned()),
    )
}

/// Install autotools packages. Returns whether the installer succeeded;
/// failure is only logged.
pub fn install_dependencies(
    installer: &[String],
    packages: &[String],
    runner: &dyn CommandRunner,
) -> bool {
    if packages.is_empty() {
        return true;
    }

    let Some(spec) = install_command(installer, packages) else {
        log::warn!("No installer command configured, skipping dependency installation");
        return false;
    };

    log::info!("Installing build dependencies: {}", packages.join(" "));
    match runner.run_checked(&spec) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Dependency installation failed, continuing: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_install_command_appends_packages() {
        let spec = install_command(&strings(DEFAULT_INSTALLER), &strings(&["m4", "autoconf"])).unwrap();
        assert_eq!(spec.program, "sudo");
        assert_eq!(spec.args, strings(&["apt-get", "install", "-y", "m4", "autoconf"]));
    }

    #[test]
    fn test_empty_installer() {
        assert!(install_command(&[], &strings(&["m4"])).is_none());
    }
}
