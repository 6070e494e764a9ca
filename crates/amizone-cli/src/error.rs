use thiserror::Error;

/// Errors from the one-shot REST and Postgres demonstrations.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Transport-level HTTP failure (DNS, TLS, connect, decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}
