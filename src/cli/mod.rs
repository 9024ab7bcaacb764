use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::Cli;
use crate::cli::commands::backup;
use crate::config::load::{load_config, resolve_settings};
use crate::config::model::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod args;
pub mod commands;

pub fn run() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.verbose);
    print_banner();

    let settings = load_settings(&cli).context("configuration")?;
    backup::run_backup_command(&cli, &settings)
        .with_context(|| format!("backup of {}:{}", cli.hostname, cli.device))?;
    Ok(())
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                print_banner();
                let _ = err.print();
                std::process::exit(0);
            }
            let _ = err.print();
            std::process::exit(2);
        }
    }
}

fn load_settings(cli: &Cli) -> crate::error::Result<Settings> {
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(user) = &cli.user {
        cfg.user = Some(user.clone());
    }
    if let Some(subvolume) = &cli.subvolume {
        cfg.subvolume = Some(subvolume.clone());
    }
    if let Some(device) = &cli.loop_device {
        cfg.loop_device = Some(device.clone());
    }
    resolve_settings(cfg)
}

fn print_banner() {
    println!("btrmirror {}", VERSION);
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
