use thiserror::Error;

/// Everything that can go wrong while extracting, transforming, or loading.
///
/// Only `Http` and `Transient` are worth retrying; all other variants signal
/// a caller/configuration problem or an upstream refusal and must propagate
/// on first occurrence.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// The remote API answered but reported a logical failure, e.g. a bad
    /// series id.  The upstream message is preserved verbatim.
    #[error("{api} API error: {message}")]
    Application { api: &'static str, message: String },

    #[error("transient error: {0}")]
    Transient(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] duckdb::Error),
}

impl EtlError {
    /// Network/transport/HTTP-status failures are eligible for retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, EtlError::Http(_) | EtlError::Transient(_))
    }
}
