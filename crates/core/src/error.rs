//! Error type shared by every dbfs crate

/// Boxed backend error carried by store and source failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for dbfs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path {path:?}: {reason}")]
    Path { path: String, reason: &'static str },

    #[error("Store error: {0}")]
    Store(#[source] BoxError),

    #[error("Notification source error: {0}")]
    Source(#[source] BoxError),

    #[error("Codec error: {0}")]
    Codec(#[source] BoxError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Background task failed: {0}")]
    Join(String),
}

impl Error {
    /// Wrap a persistence backend error
    pub fn store(err: impl Into<BoxError>) -> Self {
        Self::Store(err.into())
    }

    /// Wrap a notification source error
    pub fn source(err: impl Into<BoxError>) -> Self {
        Self::Source(err.into())
    }

    /// Wrap a serialization error
    pub fn codec(err: impl Into<BoxError>) -> Self {
        Self::Codec(err.into())
    }

    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }
}

/// Result type for dbfs operations
pub type Result<T> = std::result::Result<T, Error>;
