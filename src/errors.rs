use thiserror::Error;

/// Application-wide error type. Every failure surfaced to the user passes
/// through here so `main` can print a single diagnostic line.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database unavailable: {0}")]
    Connection(String),

    /// Bad command-line input: wrong arity, unknown command, unparseable
    /// duration, invalid URL.
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    NotFound(String),

    #[error("failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to parse feed: {0}")]
    Parse(#[from] rss::Error),

    #[error("database error: {0}")]
    Database(diesel::result::Error),

    #[error("failed to run command '{name}': {source}")]
    Command { name: String, source: Box<AppError> },
}

impl AppError {
    /// Errors that abort the aggregation loop. Fetch and parse failures are
    /// per-feed and leave the loop running; anything store-shaped means no
    /// further cycle can succeed.
    pub fn halts_aggregation(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Connection(_) | AppError::NotFound(_)
        )
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => AppError::NotFound("record not found".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl From<diesel::ConnectionError> for AppError {
    fn from(err: diesel::ConnectionError) -> Self {
        AppError::Connection(err.to_string())
    }
}
