//! Linking service client error types.

use std::sync::Arc;

/// Errors from the dejure.org linking service client.
#[derive(Debug, thiserror::Error)]
pub enum DejureError {
    /// Configured endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A filter parameter has a value the service does not understand.
    #[error("invalid parameter {key}={value:?}")]
    InvalidParam { key: String, value: String },

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Successful status but no body.
    #[error("empty response body")]
    EmptyBody,

    /// The service answered with less text than it was sent.
    #[error("response shorter than request: sent {sent} bytes, received {received}")]
    ShrunkBody { sent: usize, received: usize },

    /// Body is not valid UTF-8.
    #[error("response is not valid UTF-8")]
    InvalidEncoding,

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for DejureError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { DejureError::Timeout } else { DejureError::Network(Arc::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DejureError::HttpError { status: 503 };
        assert!(err.to_string().contains("503"));

        let err = DejureError::ShrunkBody { sent: 120, received: 3 };
        assert!(err.to_string().contains("sent 120"));

        let err = DejureError::InvalidParam { key: "buzer".into(), value: "maybe".into() };
        assert_eq!(err.to_string(), "invalid parameter buzer=\"maybe\"");
    }
}
