use serde::{Deserialize, Serialize};

/// Failures reported by the remote catalog API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ApiError {
    #[error("Version conflict: the resource is at version {current_version:?}")]
    ConcurrentModification { current_version: Option<u64> },

    #[error("Duplicate key: {key}")]
    DuplicateKey { key: String },

    #[error("{resource} not found: {key}")]
    NotFound { resource: String, key: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },
}

impl ApiError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        ApiError::Decode {
            message: message.into(),
        }
    }

    /// The supplied version was stale.
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, ApiError::ConcurrentModification { .. })
    }

    /// Transient failures worth retrying at a higher level.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network { .. } => true,
            ApiError::Http { status, .. } => *status == 429 || *status >= 500,
            ApiError::ConcurrentModification { .. }
            | ApiError::DuplicateKey { .. }
            | ApiError::NotFound { .. }
            | ApiError::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert!(ApiError::ConcurrentModification {
            current_version: Some(3)
        }
        .is_concurrent_modification());
        assert!(!ApiError::http(409, "conflict").is_concurrent_modification());
        assert!(ApiError::http(503, "unavailable").is_retryable());
        assert!(ApiError::http(429, "slow down").is_retryable());
        assert!(!ApiError::http(400, "bad").is_retryable());
        assert!(ApiError::network("reset").is_retryable());
    }
}
