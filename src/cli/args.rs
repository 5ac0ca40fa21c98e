use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Installs git repositories listed in a JSON manifest as local modules.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct CliArgs {
    /// Show modules with unsaved git changes and exit
    #[arg(long)]
    pub show_changed_modules: bool,
    /// Install modules in parallel
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub parallel_install: bool,
    /// When false, the modules folder is emptied before installing. Otherwise each module is
    /// checked separately and only reinstalled if it has no unsaved changes
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub safe_install: bool,
    /// Maximum number of modules installed at once, 0 for no limit
    #[arg(short, long)]
    pub concurrency: Option<usize>,
    /// Project root, other paths are relative to it [default: current directory]
    #[arg(short, long, env = "EASYMODULES_ROOT")]
    pub root: Option<PathBuf>,
    /// Directory modules are installed into [default: modules]
    #[arg(short, long)]
    pub modules_dir: Option<PathBuf>,
    /// JSON manifest with dependencies and devDependencies [default: modules.json]
    #[arg(short = 'f', long)]
    pub manifest: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn defaults_to_safe_parallel_install() {
        let args = CliArgs::try_parse_from(["easymodules"]).unwrap();
        assert!(!args.show_changed_modules);
        assert!(args.parallel_install);
        assert!(args.safe_install);
        assert_eq!(args.concurrency, None);
    }

    #[test]
    fn flags_take_explicit_values() {
        let args = CliArgs::try_parse_from([
            "easymodules",
            "--parallel-install",
            "false",
            "--safe-install=false",
            "--concurrency",
            "8",
            "--show-changed-modules",
        ])
        .unwrap();
        assert!(args.show_changed_modules);
        assert!(!args.parallel_install);
        assert!(!args.safe_install);
        assert_eq!(args.concurrency, Some(8));
    }
}
