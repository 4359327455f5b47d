//! Console logger behind the `log` facade.
//!
//! Info goes to stdout, warnings and errors to stderr. `--verbose` adds
//! timestamps, level tags and debug output; `--quiet` keeps warnings and
//! errors only. With `--logfile` every line is mirrored to a file with ANSI
//! color codes stripped.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

pub(crate) struct CliLogger {
    level: LevelFilter,
    verbose: bool,
    file: Option<Mutex<File>>,
}

impl CliLogger {
    pub(crate) fn new(quiet: bool, verbose: bool, logfile: Option<&Path>) -> std::io::Result<Self> {
        let level = level_for(quiet, verbose);
        let file = match logfile {
            Some(path) => Some(Mutex::new(File::create(path)?)),
            None => None,
        };
        Ok(Self {
            level,
            verbose,
            file,
        })
    }

    /// Install as the global logger.
    pub(crate) fn install(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    fn format(&self, record: &Record) -> String {
        if self.verbose {
            format!(
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            record.args().to_string()
        }
    }
}

/// `--quiet` wins over `--verbose`.
pub(crate) fn level_for(quiet: bool, verbose: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Warn
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() > self.level {
            return false;
        }
        // Dependencies only get a say in verbose mode
        self.verbose || metadata.target().starts_with("gd_harvest")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.format(record);
        if record.level() <= Level::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }

        if let Some(file) = &self.file
            && let Ok(mut f) = file.lock()
        {
            let plain = strip_ansi_escapes::strip(line.as_bytes());
            let _ = f.write_all(&plain);
            let _ = f.write_all(b"\n");
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file
            && let Ok(mut f) = file.lock()
        {
            let _ = f.flush();
        }
    }
}
