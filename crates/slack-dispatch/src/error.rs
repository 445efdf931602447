use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("verification token mismatch")]
    TokenMismatch,

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("duplicate {table} binding: {id}")]
    DuplicateBinding { table: &'static str, id: String },

    #[error("invalid command pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dedup store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("message send failed: {0}")]
    SendFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Whether the HTTP layer should answer this error with a client-error
    /// status. Everything else is acknowledged with 200 so the platform does
    /// not redeliver.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DispatchError::MalformedPayload(_))
    }
}
