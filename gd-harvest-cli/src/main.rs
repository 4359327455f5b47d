//! gd-harvest CLI
//!
//! Mirrors per-game player and inning documents from the gameday archive,
//! spreading requests over a pool of Tor circuits.

mod cli_types;
mod commands;
mod error;
mod logger;
mod spinner;

use std::path::PathBuf;

use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use gd_harvest_scraper::{ConfigSources, HarvestConfig};

use cli_types::{Cli, Commands, ConfigAction, HarvestRange};
use error::CliError;
use logger::CliLogger;

fn main() {
    let cli = Cli::parse();

    let logger = match CliLogger::new(cli.quiet, cli.verbose, cli.logfile.as_deref()) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Could not open log file: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = logger.install() {
        eprintln!("Could not install logger: {}", e);
    }

    if let Err(e) = run(cli) {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stderr, |t| t.red()),
            e,
        );
        log::logger().flush();
        std::process::exit(e.exit_code());
    }
    log::logger().flush();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let quiet = cli.quiet;
    let load = || load_config(cli.output.clone(), cli.sessions, cli.no_proxy);

    match cli.command {
        Commands::All { from, harvest } => {
            let (config, _) = load()?;
            commands::harvest::run_harvest(config, HarvestRange::AllYears { from }, harvest, quiet)
        }
        Commands::Year { year, harvest } => {
            let (config, _) = load()?;
            commands::harvest::run_harvest(config, HarvestRange::Year(year), harvest, quiet)
        }
        Commands::Month { month, harvest } => {
            let (config, _) = load()?;
            commands::harvest::run_harvest(config, HarvestRange::Month(month), harvest, quiet)
        }
        Commands::Day { day, harvest } => {
            let (config, _) = load()?;
            commands::harvest::run_harvest(config, HarvestRange::Day(day), harvest, quiet)
        }
        Commands::Rotate { circuit } => {
            let (config, _) = load()?;
            commands::rotate::run_rotate(&config, circuit, quiet)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let (config, sources) = load()?;
                commands::config::run_config_show(&config, &sources);
                Ok(())
            }
            ConfigAction::Path => commands::config::run_config_path(),
            ConfigAction::Init => commands::config::run_config_init(),
        },
    }
}

/// Config file and environment, then command-line flags on top.
fn load_config(
    output: Option<PathBuf>,
    sessions: Option<usize>,
    no_proxy: bool,
) -> Result<(HarvestConfig, ConfigSources), CliError> {
    let (config, mut sources) = HarvestConfig::load()?;
    let config = config.with_overrides(&mut sources, output, sessions, no_proxy)?;
    Ok((config, sources))
}
