use thiserror::Error;

use gd_harvest_scraper::HarvestError;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Harvest engine error
    #[error("{0}")]
    Harvest(#[from] HarvestError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The run finished but some days or games could not be harvested
    #[error("Finished with {0} failures")]
    Incomplete(usize),
}

impl CliError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Process exit code for this error.
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Self::Incomplete(_) => 2,
            _ => 1,
        }
    }
}
