//! patch_libffi CLI
//!
//! Prepares vendored libffi sources for a Buildozer / python-for-android
//! build and offers the fallback recipe for when none are found.

use clap::{Arg, ArgAction, ArgMatches, Command};
use libffi_autopatch::buildozer::BuildozerSpec;
use libffi_autopatch::config::{LogLevel, PatchConfig};
use libffi_autopatch::recipe::{self, ArchContext};
use libffi_autopatch::targets::{self, DEFAULT_ANDROID_API};
use libffi_autopatch::{locator, patch_system, run_pipeline, PatchError, SystemRunner};
use std::path::{Path, PathBuf};

fn arch_arg() -> Arg {
    Arg::new("arch")
        .long("arch")
        .help("Android ABI (armeabi-v7a, arm64-v8a, x86, x86_64)")
        .value_parser(targets::supported_archs())
        .required(true)
}

fn cli() -> Command {
    Command::new("patch_libffi")
        .version(env!("CARGO_PKG_VERSION"))
        .about("libffi autoconf patcher for Buildozer / python-for-android builds")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("apply")
                .about("Install autotools, locate libffi sources and patch them (default)")
                .arg(
                    Arg::new("skip-deps")
                        .long("skip-deps")
                        .help("Do not run the package installer")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("source-dir")
                        .long("source-dir")
                        .help("Patch this tree in addition to the ones found")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the pipeline report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("patch")
                .about("Patch configure.ac in a single source tree")
                .arg(
                    Arg::new("dir")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("build")
                .about("Build libffi for one ABI with the fallback recipe")
                .arg(arch_arg())
                .arg(
                    Arg::new("source-dir")
                        .long("source-dir")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("build-dir")
                        .long("build-dir")
                        .help("Defaults to <source-dir>/build-<arch>")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("ndk")
                        .long("ndk")
                        .help("Android NDK path (defaults to NDK_HOME / ANDROID_NDK_HOME)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("api")
                        .long("api")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("21"),
                ),
        )
        .subcommand(
            Command::new("configure-args")
                .about("Print the configure arguments the recipe uses")
                .arg(arch_arg())
                .arg(
                    Arg::new("build-dir")
                        .long("build-dir")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(Command::new("locate").about("List libffi source trees found"))
        .subcommand(
            Command::new("spec")
                .about("Inspect or edit buildozer.spec")
                .subcommand_required(true)
                .subcommand(
                    Command::new("show").arg(
                        Arg::new("spec")
                            .required(true)
                            .value_parser(clap::value_parser!(PathBuf)),
                    ),
                )
                .subcommand(
                    Command::new("set-local-recipes")
                        .arg(
                            Arg::new("spec")
                                .required(true)
                                .value_parser(clap::value_parser!(PathBuf)),
                        )
                        .arg(Arg::new("dir").required(true)),
                )
                .subcommand(
                    Command::new("add-requirement")
                        .arg(
                            Arg::new("spec")
                                .required(true)
                                .value_parser(clap::value_parser!(PathBuf)),
                        )
                        .arg(Arg::new("name").required(true)),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<PatchConfig, PatchError> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => PatchConfig::from_file(path)?,
        None => PatchConfig::default(),
    };
    let config = config.apply_env();

    if matches.get_flag("verbose") {
        Ok(config.log_level(LogLevel::Debug))
    } else {
        Ok(config)
    }
}

fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(level.into())
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run_apply(config: PatchConfig, sub: Option<&ArgMatches>) -> Result<(), PatchError> {
    let mut config = config;
    let mut json = false;

    if let Some(sub) = sub {
        if sub.get_flag("skip-deps") {
            config = config.install_dependencies(false);
        }
        if let Some(dirs) = sub.get_many::<PathBuf>("source-dir") {
            for dir in dirs {
                config = config.add_source_dir(dir);
            }
        }
        json = sub.get_flag("json");
    }

    let report = run_pipeline(&config, &SystemRunner);

    if json {
        println!("{}", report.to_json()?);
    } else {
        for tree in &report.trees {
            println!("{}: {:?}", tree.source_dir.display(), tree.outcome);
        }
        if report.fallback_recipe_required {
            println!("No libffi source found; use `patch_libffi build` or the local recipe");
        }
    }
    Ok(())
}

fn run_build(config: &PatchConfig, sub: &ArgMatches) -> Result<(), PatchError> {
    let abi = sub
        .get_one::<String>("arch")
        .ok_or_else(|| PatchError::config_error("--arch is required"))?;
    let source_dir = sub
        .get_one::<PathBuf>("source-dir")
        .ok_or_else(|| PatchError::config_error("--source-dir is required"))?;
    let build_dir = sub
        .get_one::<PathBuf>("build-dir")
        .cloned()
        .unwrap_or_else(|| source_dir.join(format!("build-{}", abi)));
    let api = sub
        .get_one::<u32>("api")
        .copied()
        .unwrap_or(DEFAULT_ANDROID_API);

    let ndk = match sub.get_one::<PathBuf>("ndk") {
        Some(ndk) => ndk.clone(),
        None => recipe::android_ndk_from_env()?,
    };

    let arch = ArchContext::for_arch(abi, &ndk, api, &build_dir)?;
    let library = config.recipe.build_arch(source_dir, &arch, &SystemRunner)?;
    println!("{}", library.display());
    Ok(())
}

fn run_configure_args(config: &PatchConfig, sub: &ArgMatches) -> Result<(), PatchError> {
    let abi = sub
        .get_one::<String>("arch")
        .ok_or_else(|| PatchError::config_error("--arch is required"))?;
    let build_dir = sub
        .get_one::<PathBuf>("build-dir")
        .ok_or_else(|| PatchError::config_error("--build-dir is required"))?;
    let triple = targets::host_triple(abi).ok_or_else(|| PatchError::unsupported_arch(abi))?;

    let arch = ArchContext::new(abi.as_str(), triple, build_dir);
    for arg in config.recipe.configure_args(&arch) {
        println!("{}", arg);
    }
    Ok(())
}

fn required_path<'a>(sub: &'a ArgMatches, name: &str) -> Result<&'a Path, PatchError> {
    sub.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .ok_or_else(|| PatchError::config_error(format!("{} is required", name)))
}

fn required_str<'a>(sub: &'a ArgMatches, name: &str) -> Result<&'a str, PatchError> {
    sub.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| PatchError::config_error(format!("{} is required", name)))
}

fn run_spec(sub: &ArgMatches) -> Result<(), PatchError> {
    match sub.subcommand() {
        Some(("show", m)) => {
            let spec = BuildozerSpec::load(required_path(m, "spec")?)?;
            println!("requirements: {}", spec.requirements().join(", "));
            println!("android.archs: {}", spec.archs().join(", "));
            println!(
                "p4a.local_recipes: {}",
                spec.local_recipes().unwrap_or_default()
            );
            for (section, key, count) in spec.duplicate_keys() {
                println!("duplicate: [{}] {} x{}", section, key, count);
            }
        }
        Some(("set-local-recipes", m)) => {
            let path = required_path(m, "spec")?;
            let mut spec = BuildozerSpec::load(path)?;
            spec.set_local_recipes(required_str(m, "dir")?);
            spec.save(path)?;
        }
        Some(("add-requirement", m)) => {
            let path = required_path(m, "spec")?;
            let mut spec = BuildozerSpec::load(path)?;
            if spec.add_requirement(required_str(m, "name")?) {
                spec.save(path)?;
            }
        }
        _ => unreachable!("clap enforces a spec subcommand"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();

    let config = load_config(&matches)?;
    init_logging(config.log_level);

    match matches.subcommand() {
        None => run_apply(config, None)?,
        Some(("apply", sub)) => run_apply(config, Some(sub))?,
        Some(("patch", sub)) => {
            let dir = required_path(sub, "dir")?;
            let outcome = patch_system::apply_patch(dir)?;
            println!("{}: {:?}", dir.display(), outcome);
        }
        Some(("build", sub)) => run_build(&config, sub)?,
        Some(("configure-args", sub)) => run_configure_args(&config, sub)?,
        Some(("locate", _)) => {
            for tree in locator::locate_sources(&config.all_search_roots(), config.max_depth) {
                println!("{}", tree.display());
            }
        }
        Some(("spec", sub)) => run_spec(sub)?,
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }

    // `apply` reports problems through warnings, never through the exit code.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_bare_invocation_parses() {
        let matches = cli().try_get_matches_from(["patch_libffi"]).unwrap();
        assert!(matches.subcommand().is_none());
    }

    #[test]
    fn test_build_rejects_unknown_arch() {
        let result = cli().try_get_matches_from([
            "patch_libffi",
            "build",
            "--arch",
            "mips",
            "--source-dir",
            "/src",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_recipe_is_used() {
        assert_eq!(
            libffi_autopatch::LibffiRecipe::default(),
            PatchConfig::default().recipe
        );
    }
}
