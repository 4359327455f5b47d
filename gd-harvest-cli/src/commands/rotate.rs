use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gd_harvest_scraper::{HarvestConfig, SessionPool};

use crate::error::CliError;

/// Ask the control port for a new identity on one circuit.
pub(crate) fn run_rotate(
    config: &HarvestConfig,
    circuit: usize,
    quiet: bool,
) -> Result<(), CliError> {
    if !config.use_proxy {
        return Err(CliError::config(
            "Proxying is disabled; there is no circuit to rotate",
        ));
    }
    let pool = SessionPool::from_config(config)?;
    let label = pool
        .circuit(circuit)
        .map(|c| c.to_string())
        .ok_or_else(|| {
            CliError::config(format!(
                "No circuit {} (pool has {})",
                circuit,
                pool.len()
            ))
        })?;

    let rt = tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))?;
    rt.block_on(async {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                    .expect("static pattern")
                    .tick_chars("/-\\|"),
            );
            pb.set_message(format!("Contacting {}...", config.control_addr()));
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        };

        let result = pool.rotate(circuit).await;
        pb.finish_and_clear();
        result
    })?;

    log::info!(
        "{} New identity requested for {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        label,
    );
    Ok(())
}
