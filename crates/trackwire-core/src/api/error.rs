use thiserror::Error;

/// Maximum length for error response bodies in rendered messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Any non-2xx response that is not recovered by the refresh protocol,
    /// including a second 401 after a completed refresh-retry cycle.
    /// `body` holds the response text verbatim; only the rendered message
    /// truncates it.
    #[error("request failed with status {status}: {}", truncate_body(.body))]
    Request { status: u16, body: String },

    /// The refresh protocol could not produce a usable credential. The user
    /// has already been signed out; do not retry.
    #[error("session expired - sign in again")]
    SessionExpired,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Truncate a response body to avoid dumping excessive data into messages
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..MAX_ERROR_BODY_LENGTH],
            body.len()
        )
    }
}
