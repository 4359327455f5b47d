use std::collections::HashMap;
use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gd_harvest_core::GameTask;
use gd_harvest_lib::async_util::run_with_events;
use gd_harvest_scraper::{HarvestConfig, HarvestEvent, HarvestLog, Harvester, LogEntry};

use crate::cli_types::{HarvestArgs, HarvestRange};
use crate::error::CliError;
use crate::spinner::SpinnerPool;

/// Spinner keys for fetch workers start here; discovery uses day-of-month keys.
const WORKER_KEY: usize = 1 << 16;

/// Running totals shown on the status line.
#[derive(Default)]
struct Progress {
    days: usize,
    days_failed: usize,
    queued: usize,
    fetched: usize,
    failed: usize,
    /// Game each worker's spinner currently shows.
    showing: HashMap<usize, GameTask>,
}

impl Progress {
    fn apply(&mut self, spinners: &mut SpinnerPool, event: HarvestEvent) {
        match event {
            HarvestEvent::DiscoveryStarted { month, days } => {
                spinners.set_status(format!("Listing {} ({} days)", month, days));
            }
            HarvestEvent::DayStarted { day, session } => {
                spinners.claim(
                    day.day() as usize,
                    format!("[session {}] listing {}", session, day),
                );
            }
            HarvestEvent::DayDiscovered { day, queued, .. } => {
                self.days += 1;
                self.queued += queued;
                spinners.release(day.day() as usize);
                spinners.set_status(format!(
                    "{} days listed, {} games queued",
                    self.days, self.queued
                ));
            }
            HarvestEvent::DayFailed { day, .. } => {
                self.days_failed += 1;
                spinners.release(day.day() as usize);
            }
            HarvestEvent::FetchStarted { workers, queued } => {
                spinners.set_status(format!(
                    "Fetching {} games with {} workers",
                    queued, workers
                ));
            }
            HarvestEvent::GameStarted { worker, game } => {
                spinners.claim(
                    WORKER_KEY + worker,
                    format!("[worker {}] {}", worker, game.game_id()),
                );
                self.showing.insert(worker, game);
            }
            HarvestEvent::GameCompleted { worker, game } => {
                self.fetched += 1;
                if self.finish_game(worker, &game) {
                    spinners.release(WORKER_KEY + worker);
                }
                self.show_fetch_status(spinners);
            }
            HarvestEvent::GameFailed { worker, game, .. } => {
                self.failed += 1;
                if self.finish_game(worker, &game) {
                    spinners.release(WORKER_KEY + worker);
                }
                self.show_fetch_status(spinners);
            }
            HarvestEvent::WorkerCrashed { worker } => {
                self.showing.remove(&worker);
                spinners.release(WORKER_KEY + worker);
            }
            HarvestEvent::Done => {}
        }
    }

    /// Whether the worker's spinner still shows `game`. A worker may already
    /// have started its next game by the time the previous one is reported.
    fn finish_game(&mut self, worker: usize, game: &GameTask) -> bool {
        if self.showing.get(&worker) == Some(game) {
            self.showing.remove(&worker);
            true
        } else {
            false
        }
    }

    fn show_fetch_status(&self, spinners: &SpinnerPool) {
        spinners.set_status(format!(
            "{}/{} games fetched, {} failed",
            self.fetched, self.queued, self.failed
        ));
    }
}

/// Run one of the harvest commands.
pub(crate) fn run_harvest(
    config: HarvestConfig,
    range: HarvestRange,
    args: HarvestArgs,
    quiet: bool,
) -> Result<(), CliError> {
    let output = config.output_root();
    let harvester = Harvester::from_config(&config)?;
    let sessions = harvester.pool().len();

    log::info!(
        "Harvesting {} into {}",
        range.if_supports_color(Stdout, |t| t.bold()),
        output.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    let route = if config.use_proxy {
        format!("through {} Tor circuits", sessions)
    } else {
        format!("with {} direct sessions", sessions)
    };
    log::info!("{}", route.if_supports_color(Stdout, |t| t.dimmed()));
    log::info!("");

    let rt = tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))?;
    let start_year = config.start_year;

    let result = rt.block_on(async move {
        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel::<HarvestEvent>();
        let harvester = harvester.with_events(event_tx);

        // Owns the harvester so the event channel closes when the run ends
        let task = async move {
            match range {
                HarvestRange::AllYears { from } => {
                    harvester.run_all_years(from.unwrap_or(start_year)).await
                }
                HarvestRange::Year(year) => harvester.run_year(year).await,
                HarvestRange::Month(month) => harvester.run_month(month).await,
                HarvestRange::Day(day) => harvester.run_day(day).await,
            }
        };

        let mut spinners = SpinnerPool::new(sessions, quiet);
        let mut progress = Progress::default();
        let result = run_with_events(task, event_rx, |e| progress.apply(&mut spinners, e)).await;
        spinners.clear_all();
        result
    });

    let log = result?;
    print_summary(&log);

    if !args.no_log {
        write_log_file(&log, &output, &range);
    }
    if let Some(path) = &args.report {
        let report = log.failure_report();
        report.write_json(path)?;
        log::info!(
            "Failure report written to {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
        );
    }

    let summary = log.summary();
    if summary.has_failures() {
        return Err(CliError::Incomplete(
            summary.days_failed + summary.games_failed + summary.workers_crashed,
        ));
    }
    Ok(())
}

fn print_summary(log: &HarvestLog) {
    let summary = log.summary();

    log::info!("{}", "Summary:".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  {} {} days listed, {} games found",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        summary.days_scanned,
        summary.games_listed,
    );
    log::info!(
        "  {} {} games fetched",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        summary.games_fetched,
    );
    if summary.games_skipped > 0 {
        log::info!(
            "  {} {} already on disk",
            "-".if_supports_color(Stdout, |t| t.dimmed()),
            summary.games_skipped,
        );
    }
    if summary.days_failed > 0 {
        log::warn!(
            "  {} {} days could not be listed",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            summary.days_failed,
        );
    }
    if summary.games_failed > 0 {
        log::warn!(
            "  {} {} games failed",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            summary.games_failed,
        );
    }
    if summary.workers_crashed > 0 {
        log::warn!(
            "  {} {} workers crashed",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            summary.workers_crashed,
        );
    }

    // Per-item details for problem entries
    for entry in log.entries() {
        match entry {
            LogEntry::DayFailed { day, message } => {
                log::warn!("    {}: {}", day, message);
            }
            LogEntry::GameFailed { game, message } => {
                log::warn!("    {}: {}", game.relative_dir_str(), message);
            }
            _ => {}
        }
    }
}

fn write_log_file(log: &HarvestLog, output: &Path, range: &HarvestRange) {
    let log_path = output.join(format!(
        "harvest-log-{}-{}.txt",
        range.tag(),
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
    ));
    if let Err(e) = std::fs::create_dir_all(output) {
        log::warn!("Warning: could not create output dir: {}", e);
    } else if let Err(e) = log.write_to_file(&log_path) {
        log::warn!("Warning: could not write harvest log: {}", e);
    } else {
        log::debug!("Harvest log written to {}", log_path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: &str = "http://gd2.mlb.com/components/game/mlb/year_2016/month_06/day_01";

    fn game(n: u32) -> GameTask {
        GameTask::new(format!("{}/gid_2016_06_01_nyamlb_bosmlb_{}/", DAY, n)).unwrap()
    }

    #[test]
    fn test_late_completion_keeps_next_game_slot() {
        let mut spinners = SpinnerPool::new(1, true);
        let mut progress = Progress::default();

        progress.apply(&mut spinners, HarvestEvent::GameStarted { worker: 0, game: game(1) });
        progress.apply(&mut spinners, HarvestEvent::GameStarted { worker: 0, game: game(2) });
        progress.apply(&mut spinners, HarvestEvent::GameCompleted { worker: 0, game: game(1) });
        assert_eq!(progress.showing.get(&0), Some(&game(2)));
        assert_eq!(progress.fetched, 1);

        progress.apply(
            &mut spinners,
            HarvestEvent::GameFailed {
                worker: 0,
                game: game(2),
                message: "HTTP 503".to_string(),
            },
        );
        assert!(progress.showing.is_empty());
        assert_eq!(progress.failed, 1);
    }

    #[test]
    fn test_completion_releases_current_game() {
        let mut progress = Progress::default();
        progress.showing.insert(3, game(7));
        assert!(!progress.finish_game(3, &game(8)));
        assert!(progress.finish_game(3, &game(7)));
        assert!(!progress.finish_game(3, &game(7)));
    }
}
