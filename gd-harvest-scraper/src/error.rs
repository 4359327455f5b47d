use gd_harvest_core::CoreError;
use gd_harvest_lib::QueueError;

/// A single request through one session failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Blocked by archive (HTTP {status}): {url}")]
    Blocked { status: u16, url: String },

    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("Request rejected (HTTP {status}): {url}")]
    Rejected { status: u16, url: String },

    #[error("Server error (HTTP {status}): {url}")]
    Server { status: u16, url: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("No session {index} (pool has {size})")]
    NoSuchSession { index: usize, size: usize },

    #[error("Could not build HTTP session: {0}")]
    Setup(String),
}

impl FetchError {
    /// Map a non-success HTTP status to its error kind.
    pub fn from_status(status: u16, url: impl Into<String>) -> Self {
        let url = url.into();
        match status {
            403 | 429 => Self::Blocked { status, url },
            404 | 410 => Self::NotFound { url },
            500..=599 => Self::Server { status, url },
            _ => Self::Rejected { status, url },
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Blocked { .. } | Self::Server { .. } | Self::Transport { .. }
        )
    }

    /// The archive is throttling this circuit's exit address.
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Asking the proxy control port for a new circuit failed.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("Control port I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Control port rejected {command} ({code}): {message}")]
    Rejected {
        command: &'static str,
        code: String,
        message: String,
    },

    #[error("Control port did not answer within {0}s")]
    Timeout(u64),

    #[error("Control port closed the connection")]
    Closed,
}

/// Writing a game's documents failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed {document}: {message}")]
    MalformedXml {
        document: &'static str,
        message: String,
    },
}

/// Errors surfaced by harvest runs.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Rotation(#[from] RotationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Task queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HarvestError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
