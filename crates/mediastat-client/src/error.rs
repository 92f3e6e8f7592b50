use thiserror::Error;

/// Errors returned by the catalog and analytics API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 from an upstream service.
    #[error("rate limited by {url}")]
    RateLimited { url: String },

    /// HTTP 404; the requested resource does not exist.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required credential or account setting is absent.
    #[error("auth configuration error: missing {0}")]
    AuthConfig(String),

    /// The credential exchange was rejected or exhausted its retries.
    #[error("credential exchange failed: {0}")]
    AuthExchange(String),

    /// A configured base URL could not be parsed.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ApiError {
    /// Returns `true` for errors that are worth retrying after a back-off delay.
    ///
    /// **Retriable:** HTTP 429, 408 and 5xx responses; network-level timeouts
    /// and connection failures.
    ///
    /// **Not retriable:** 404 and other 4xx statuses, malformed bodies, and
    /// configuration or credential errors.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            ApiError::RateLimited { .. } => true,
            ApiError::UnexpectedStatus { status, .. } => *status == 408 || *status >= 500,
            ApiError::NotFound { .. }
            | ApiError::Deserialize { .. }
            | ApiError::AuthConfig(_)
            | ApiError::AuthExchange(_)
            | ApiError::InvalidBaseUrl { .. } => false,
        }
    }
}
