//! `usersync` entry point: loads settings, parses the command line, and runs
//! the requested synchronisation.

use std::ffi::OsString;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use usersync::inbound::cli::{Cli, Command, run};
use usersync::settings::SyncSettings;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = SyncSettings::load_from_iter([OsString::from("usersync")])
        .wrap_err("failed to load usersync settings")?;
    let settings = cli.apply_overrides(settings);

    let summary = run(&cli, &settings, &mut io::stdout().lock())?;
    // Report outcomes fail for documents that are merely in sync.
    let failed = cli.command != Command::Report && summary.failed > 0;
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
