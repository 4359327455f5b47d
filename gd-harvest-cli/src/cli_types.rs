//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gd_harvest_core::{CalendarDay, MonthSpec};

#[derive(Parser)]
#[command(name = "gd-harvest")]
#[command(
    about = "Mirror gameday player and inning data through rotating Tor circuits",
    long_about = None
)]
pub(crate) struct Cli {
    /// Output root for the game tree (defaults to config, then current directory)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Number of sessions / fetch workers (capped by the number of SOCKS ports)
    #[arg(short, long, global = true)]
    pub sessions: Option<usize>,

    /// Connect directly instead of through the SOCKS proxies
    #[arg(long, global = true)]
    pub no_proxy: bool,

    /// Only show warnings and errors (suppress normal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log output to a file (ANSI codes stripped)
    #[arg(long, global = true)]
    pub logfile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every harvest command.
#[derive(Args, Clone, Default)]
pub(crate) struct HarvestArgs {
    /// Disable the harvest log file
    #[arg(long)]
    pub no_log: bool,

    /// Write the days and games that failed as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Harvest every season from the start year through the current one
    All {
        /// First season (default: config start_year, 2007)
        #[arg(long, value_name = "YEAR")]
        from: Option<i32>,

        #[command(flatten)]
        harvest: HarvestArgs,
    },

    /// Harvest one season
    Year {
        /// Season, e.g. 2016
        year: i32,

        #[command(flatten)]
        harvest: HarvestArgs,
    },

    /// Harvest one month
    Month {
        /// Month as YYYY-MM
        month: MonthSpec,

        #[command(flatten)]
        harvest: HarvestArgs,
    },

    /// Harvest one day
    Day {
        /// Day as YYYY-MM-DD
        day: CalendarDay,

        #[command(flatten)]
        harvest: HarvestArgs,
    },

    /// Ask Tor for a new identity
    Rotate {
        /// Circuit index to report against (default 0)
        #[arg(long, default_value_t = 0)]
        circuit: usize,
    },

    /// Manage the harvest configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show every setting and where it came from
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with the defaults
    Init,
}

/// Date range selected by a harvest command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HarvestRange {
    AllYears { from: Option<i32> },
    Year(i32),
    Month(MonthSpec),
    Day(CalendarDay),
}

impl std::fmt::Display for HarvestRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllYears { from: Some(y) } => write!(f, "{} to today", y),
            Self::AllYears { from: None } => write!(f, "every season"),
            Self::Year(y) => write!(f, "{}", y),
            Self::Month(m) => write!(f, "{}", m),
            Self::Day(d) => write!(f, "{}", d),
        }
    }
}

impl HarvestRange {
    /// Short tag used in log file names.
    pub(crate) fn tag(&self) -> String {
        match self {
            Self::AllYears { .. } => "all".to_string(),
            other => other.to_string(),
        }
    }
}
