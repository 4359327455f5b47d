use std::path::{Path, PathBuf};

use gd_harvest_core::{CalendarDay, GameTask};
use serde::Serialize;

/// A single entry in the harvest log.
#[derive(Debug, Clone)]
pub enum LogEntry {
    DayScanned {
        day: CalendarDay,
        found: usize,
        queued: usize,
    },
    DayFailed {
        day: CalendarDay,
        message: String,
    },
    /// Both documents were fetched and written.
    Fetched { game: GameTask, dir: PathBuf },
    /// Already on disk; not queued.
    Skipped { game: GameTask },
    GameFailed { game: GameTask, message: String },
    WorkerCrashed { worker: usize },
}

/// Collects harvest results and writes a log file.
#[derive(Debug, Default)]
pub struct HarvestLog {
    entries: Vec<LogEntry>,
}

impl HarvestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Append every entry of `other`, e.g. one year's log into a full run's.
    pub fn merge(&mut self, other: HarvestLog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn summary(&self) -> LogSummary {
        let mut summary = LogSummary::default();
        for entry in &self.entries {
            match entry {
                LogEntry::DayScanned { found, queued, .. } => {
                    summary.days_scanned += 1;
                    summary.games_listed += found;
                    summary.games_queued += queued;
                }
                LogEntry::DayFailed { .. } => summary.days_failed += 1,
                LogEntry::Fetched { .. } => summary.games_fetched += 1,
                LogEntry::Skipped { .. } => summary.games_skipped += 1,
                LogEntry::GameFailed { .. } => summary.games_failed += 1,
                LogEntry::WorkerCrashed { .. } => summary.workers_crashed += 1,
            }
        }
        summary
    }

    /// Days and games that could not be harvested.
    pub fn failure_report(&self) -> FailureReport {
        let mut report = FailureReport::default();
        for entry in &self.entries {
            match entry {
                LogEntry::DayFailed { day, message } => report.days.push(FailedDay {
                    day: day.to_string(),
                    error: message.clone(),
                }),
                LogEntry::GameFailed { game, message } => report.games.push(FailedGame {
                    url: game.base_url().to_string(),
                    dir: game.relative_dir_str().to_string(),
                    error: message.clone(),
                }),
                _ => {}
            }
        }
        report
    }

    /// Write the log to a file.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        use std::io::Write;

        let mut file = std::fs::File::create(path)?;
        let summary = self.summary();

        writeln!(file, "=== Harvest Log ===")?;
        writeln!(
            file,
            "Date: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(file)?;
        writeln!(file, "--- Summary ---")?;
        writeln!(
            file,
            "Days scanned: {} ({} failed)",
            summary.days_scanned, summary.days_failed
        )?;
        writeln!(
            file,
            "Games listed: {} (queued: {}, already on disk: {})",
            summary.games_listed, summary.games_queued, summary.games_skipped
        )?;
        writeln!(file, "Fetched: {}", summary.games_fetched)?;
        writeln!(file, "Failed: {}", summary.games_failed)?;
        if summary.workers_crashed > 0 {
            writeln!(file, "Crashed workers: {}", summary.workers_crashed)?;
        }
        writeln!(file)?;
        writeln!(file, "--- Details ---")?;
        writeln!(file)?;

        for entry in &self.entries {
            match entry {
                LogEntry::DayScanned { day, found, queued } => {
                    writeln!(file, "[DAY] {}: {} games, {} queued", day, found, queued)?;
                }
                LogEntry::DayFailed { day, message } => {
                    writeln!(file, "[DAY FAILED] {}: {}", day, message)?;
                }
                LogEntry::Fetched { game, dir } => {
                    writeln!(file, "[OK] {} -> {}", game.game_id(), dir.display())?;
                }
                LogEntry::Skipped { game } => {
                    writeln!(file, "[SKIP] {}", game.game_id())?;
                }
                LogEntry::GameFailed { game, message } => {
                    writeln!(file, "[ERROR] {}: {}", game, message)?;
                }
                LogEntry::WorkerCrashed { worker } => {
                    writeln!(file, "[CRASH] worker {}", worker)?;
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogSummary {
    pub days_scanned: usize,
    pub days_failed: usize,
    pub games_listed: usize,
    pub games_queued: usize,
    pub games_skipped: usize,
    pub games_fetched: usize,
    pub games_failed: usize,
    pub workers_crashed: usize,
}

impl LogSummary {
    pub fn has_failures(&self) -> bool {
        self.days_failed > 0 || self.games_failed > 0 || self.workers_crashed > 0
    }
}

/// Machine-readable list of what a run failed to harvest.
#[derive(Debug, Default, Serialize)]
pub struct FailureReport {
    pub days: Vec<FailedDay>,
    pub games: Vec<FailedGame>,
}

#[derive(Debug, Serialize)]
pub struct FailedDay {
    pub day: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct FailedGame {
    pub url: String,
    pub dir: String,
    pub error: String,
}

impl FailureReport {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty() && self.games.is_empty()
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), crate::error::HarvestError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/log_tests.rs"]
mod tests;
