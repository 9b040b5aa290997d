//! Typed errors for the profiling library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that terminate a profiling run.
///
/// Per-page fetch failures and per-call model failures are absorbed by the
/// components that encounter them and surfaced through [`RunMetadata`]
/// counters; only the variants below propagate to the caller.
///
/// [`RunMetadata`]: crate::types::RunMetadata
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The root page could not be fetched after exhausting its retry budget.
    #[error("root page unreachable: {url}: {source}")]
    RootUnreachable {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The caller aborted the run before any page data existed.
    #[error("operation cancelled")]
    Cancelled,

    /// The seed target could not be constructed (malformed root URL).
    #[error("invalid seed URL: {url}")]
    InvalidSeed { url: String },
}

/// Errors from a single page fetch.
///
/// These are recorded on the [`PageRecord`] for the affected URL and never
/// abort the crawl, except for the root page (see
/// [`ProfileError::RootUnreachable`]).
///
/// [`PageRecord`]: crate::types::PageRecord
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, DNS).
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-2xx response status.
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// The per-request timeout elapsed.
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// The response body could not be read.
    #[error("body read error: {0}")]
    BodyRead(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors from a language-model call.
///
/// Transport-shaped variants are retried with exponential backoff by the
/// pipeline; response-shaped variants trigger the calling component's
/// corrective-retry-then-heuristic-fallback path.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport-level failure reaching the model API.
    #[error("model transport error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The API returned a non-success status (rate limit, auth, server).
    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The per-call timeout elapsed.
    #[error("model call timed out")]
    Timeout,

    /// The API response carried no choices.
    #[error("no choices in model response")]
    NoChoices,

    /// The response text did not satisfy the declared output contract.
    #[error("invalid model output: {reason}")]
    InvalidResponse { reason: String },

    /// The caller aborted the run while a call was pending.
    #[error("model call cancelled")]
    Cancelled,

    /// Client-side configuration problem (missing API key).
    #[error("model config error: {0}")]
    Config(String),
}

impl ModelError {
    /// Whether the pipeline's backoff loop should retry this error.
    ///
    /// Response-shape problems are handled by corrective retries instead,
    /// so only transport-level failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::Http(_)
                | ModelError::Timeout
                | ModelError::Api { status: 429, .. }
                | ModelError::Api { status: 500..=599, .. }
        )
    }
}

/// Result type alias for profiling runs.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for model calls.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_model_errors() {
        assert!(ModelError::Timeout.is_retryable());
        assert!(ModelError::Api {
            status: 429,
            message: "rate limited".into()
        }
        .is_retryable());
        assert!(ModelError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_retryable());

        assert!(!ModelError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!ModelError::InvalidResponse {
            reason: "not json".into()
        }
        .is_retryable());
    }
}
