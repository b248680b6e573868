use ctsync_api::ApiError;

/// Why a single draft could not be synchronized.
///
/// Every variant is fatal to one draft only; the run carries on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    #[error("draft is null")]
    NullDraft,

    #[error("draft with name {name} has no key")]
    MissingKey { name: String },

    #[error("draft with key {key} is invalid: {message}")]
    InvalidDraft { key: String, message: String },

    #[error("failed to resolve references")]
    ReferenceResolution {
        #[source]
        source: ApiError,
    },

    #[error("failed to fetch existing resources with keys {keys:?}")]
    FetchExisting {
        keys: Vec<String>,
        #[source]
        source: ApiError,
    },

    #[error("failed to create resource with key {key}")]
    Create {
        key: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to update resource with key {key}")]
    Update {
        key: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to update resource with key {key}: version conflict persisted after {attempts} attempt(s)")]
    RetriesExhausted { key: String, attempts: u32 },

    #[error("failed to update resource with key {key}: it was not found when re-fetching after a version conflict")]
    NotFoundOnRetry { key: String },

    #[error("failed to re-fetch resource with key {key} after a version conflict")]
    RefetchFailed {
        key: String,
        #[source]
        source: ApiError,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub fn missing_key(name: impl Into<String>) -> Self {
        SyncError::MissingKey { name: name.into() }
    }

    pub fn invalid_draft(key: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::InvalidDraft {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn reference_resolution(source: ApiError) -> Self {
        SyncError::ReferenceResolution { source }
    }

    /// Underlying transport error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SyncError::ReferenceResolution { source, .. }
            | SyncError::FetchExisting { source, .. }
            | SyncError::Create { source, .. }
            | SyncError::Update { source, .. }
            | SyncError::RefetchFailed { source, .. } => Some(source),
            SyncError::NullDraft
            | SyncError::MissingKey { .. }
            | SyncError::InvalidDraft { .. }
            | SyncError::RetriesExhausted { .. }
            | SyncError::NotFoundOnRetry { .. } => None,
        }
    }

    /// Rejected before any remote call was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SyncError::NullDraft | SyncError::MissingKey { .. } | SyncError::InvalidDraft { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_reporting_format() {
        assert_eq!(SyncError::NullDraft.to_string(), "draft is null");
        assert_eq!(
            SyncError::missing_key("Shoes").to_string(),
            "draft with name Shoes has no key"
        );
    }

    #[test]
    fn exposes_transport_cause() {
        let err = SyncError::Update {
            key: "k".into(),
            source: ApiError::network("reset"),
        };
        assert!(matches!(err.api_error(), Some(ApiError::Network { .. })));
        assert!(!err.is_validation());
        assert!(SyncError::NullDraft.api_error().is_none());
        assert!(SyncError::NullDraft.is_validation());
    }
}
