//! `tabula` command-line entry point

mod cli;
mod commands;
mod logging;
mod output;
mod settings;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;
use crate::settings::Settings;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let log_config = if cli.verbose {
        settings.logging.clone().verbose()
    } else {
        settings.logging.clone()
    };
    let _log_guard = logging::init(&log_config)?;

    commands::run(cli, settings)
}
