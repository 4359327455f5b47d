use thiserror::Error;

/// Errors raised while building or validating harvest data model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Not a valid `YYYY-MM-DD` calendar day
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Not a valid `YYYY-MM` month
    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    /// Year outside the range the archive layout can express
    #[error("Invalid year: {0}")]
    InvalidYear(String),

    /// URL that cannot identify a game directory
    #[error("Invalid game URL: {0}")]
    InvalidGameUrl(String),
}

impl CoreError {
    pub fn invalid_date(msg: impl Into<String>) -> Self {
        Self::InvalidDate(msg.into())
    }

    pub fn invalid_month(msg: impl Into<String>) -> Self {
        Self::InvalidMonth(msg.into())
    }

    pub fn invalid_year(msg: impl Into<String>) -> Self {
        Self::InvalidYear(msg.into())
    }

    pub fn invalid_game_url(msg: impl Into<String>) -> Self {
        Self::InvalidGameUrl(msg.into())
    }
}
