//! Provider error types

use tdg_repair::JsonRepairError;

/// A provider attempt that produced no usable cases.
///
/// Never user-visible: the orchestrator absorbs it by substituting the next
/// provider.
#[derive(Debug, thiserror::Error)]
pub enum GenerationProviderError {
    /// Backend did not answer in time
    #[error("{backend} timed out after {secs}s")]
    Timeout {
        /// Backend name
        backend: String,
        /// Configured timeout
        secs: u64,
    },

    /// Connection or protocol failure
    #[error("{backend} transport error: {reason}")]
    Transport {
        /// Backend name
        backend: String,
        /// Underlying error
        reason: String,
    },

    /// Non-success HTTP status
    #[error("{backend} returned status {status}: {body}")]
    BadStatus {
        /// Backend name
        backend: String,
        /// HTTP status
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Response text could not be turned into JSON
    #[error("unrepairable response: {0}")]
    Unrepairable(#[from] JsonRepairError),

    /// Response parsed but held no cases
    #[error("{backend} returned no usable cases")]
    EmptyResponse {
        /// Backend name
        backend: String,
    },

    /// Backend is not configured
    #[error("{backend} is not available")]
    Unavailable {
        /// Backend name
        backend: String,
    },
}

impl GenerationProviderError {
    /// Map a `reqwest` failure
    #[must_use]
    pub fn from_transport(backend: &str, secs: u64, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                backend: backend.to_string(),
                secs,
            }
        } else {
            Self::Transport {
                backend: backend.to_string(),
                reason: error.to_string(),
            }
        }
    }

    /// Whether the same backend might succeed on another attempt
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::BadStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Unrepairable(_) | Self::EmptyResponse { .. } | Self::Unavailable { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        let status = |status| GenerationProviderError::BadStatus {
            backend: "openai".into(),
            status,
            body: String::new(),
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!GenerationProviderError::from(JsonRepairError::EmptyInput).is_retryable());
    }
}
