use std::time::Duration;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials, unknown repository or unusable input. Raised before any
    /// request is made.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{context}")]
    Remote {
        context: String,
        #[source]
        source: BoxError,
    },
    /// A remote failure that is expected to clear up by itself, e.g. run logs that
    /// have not been published yet.
    #[error("{context} (transient)")]
    Transient {
        context: String,
        #[source]
        source: BoxError,
    },
    #[error("invalid log archive")]
    Archive(#[source] BoxError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cancelled")]
    Cancelled,
    #[error("gave up after {attempts} attempts ({}s)", .waited.as_secs())]
    TimedOut { waited: Duration, attempts: u32 },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn remote(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Remote { context: context.into(), source: source.into() }
    }

    pub fn transient(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transient { context: context.into(), source: source.into() }
    }

    pub fn is_transient(&self) -> bool { matches!(self, Self::Transient { .. }) }
}
