use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced at the crate boundary. Callers can match on the kind to
/// pick a retry or resync strategy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request referenced a content item this deployment does not know.
    #[error("unknown post '{0}'")]
    UnknownPost(i64),

    /// Malformed cursor fields. The client should request a fresh bootstrap
    /// cursor instead of retrying the same poll.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// The underlying persistence is unreachable. Never retried internally;
    /// the caller owns the retry policy.
    #[error("change log store unavailable: {0}")]
    StoreUnavailable(#[source] Box<dyn StdError + Send + Sync>),

    /// The external renderer failed while building an Insert payload.
    #[error("comment renderer unavailable: {0}")]
    RenderUnavailable(#[source] Box<dyn StdError + Send + Sync>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn store_unavailable(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Error::StoreUnavailable(source.into())
    }

    pub fn render_unavailable(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Error::RenderUnavailable(source.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StoreUnavailable(Box::new(err))
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Error::StoreUnavailable(Box::new(err))
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(err: rusqlite_migration::Error) -> Self {
        Error::StoreUnavailable(Box::new(err))
    }
}
