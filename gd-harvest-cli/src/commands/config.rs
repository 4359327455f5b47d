use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gd_harvest_lib::settings;
use gd_harvest_scraper::{ConfigSources, HarvestConfig};

use crate::error::CliError;

/// Show every resolved setting and where it came from.
pub(crate) fn run_config_show(config: &HarvestConfig, sources: &ConfigSources) {
    log::info!(
        "{}",
        "gd-harvest Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");

    match settings::config_path() {
        Some(p) if p.exists() => {
            log::info!(
                "  Config file: {} {}",
                p.display().if_supports_color(Stdout, |t| t.cyan()),
                "(exists)".if_supports_color(Stdout, |t| t.green()),
            );
        }
        Some(p) => {
            log::info!(
                "  Config file: {} {}",
                p.display().if_supports_color(Stdout, |t| t.cyan()),
                "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
            );
        }
        None => {
            log::info!(
                "  Config file: {}",
                "could not determine path".if_supports_color(Stdout, |t| t.red()),
            );
        }
    }
    log::info!("");

    for (name, value) in config.display_values() {
        let source = sources
            .get(name)
            .map(|s| format!("({})", s))
            .unwrap_or_default();
        log::info!(
            "  {} {} {}",
            format!("{}:", name).if_supports_color(Stdout, |t| t.cyan()),
            value,
            source.if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
}

/// Print the config file path.
pub(crate) fn run_config_path() -> Result<(), CliError> {
    let path = settings::config_path()
        .ok_or_else(|| CliError::config("Could not determine config directory"))?;
    log::info!("{}", path.display());
    Ok(())
}

/// Write a config file holding the defaults.
pub(crate) fn run_config_init() -> Result<(), CliError> {
    let path = gd_harvest_scraper::write_default_config()?;
    log::info!(
        "{} Default config written to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}
