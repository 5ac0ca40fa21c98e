use std::{env, num::NonZeroUsize, process};

use anyhow::bail;
use clap::Parser;
use easymodules::{cli::args::CliArgs, config::EasyModulesConfig, EasyModules, InstallOptions};

async fn run() -> anyhow::Result<()> {
    let cli_args: CliArgs = CliArgs::parse();

    let root = match cli_args.root {
        Some(root) => root,
        None => env::current_dir()?,
    };
    let config = EasyModulesConfig::load(&root)?;

    let mut builder = EasyModules::builder().root(&root);
    if let Some(modules_dir) = cli_args.modules_dir {
        builder = builder.modules_directory(modules_dir);
    }
    if let Some(manifest) = cli_args.manifest {
        builder = builder.manifest_file_name(manifest);
    }
    if let Some(concurrency) = cli_args.concurrency {
        builder = builder.concurrency(NonZeroUsize::new(concurrency));
    }
    let easymodules = builder.config(config).try_build()?;

    if cli_args.show_changed_modules {
        easymodules.changed_modules()?;
        return Ok(());
    }

    let report = easymodules
        .install(InstallOptions {
            parallel: cli_args.parallel_install,
            safe: cli_args.safe_install,
        })
        .await?;

    let failures = report.failures();
    if !failures.is_empty() {
        bail!(
            "{} of {} modules failed to install",
            failures.len(),
            report.count
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{:#}", e);
        process::exit(1);
    }
}
