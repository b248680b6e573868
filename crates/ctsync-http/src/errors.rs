//! Mapping of error responses and transport failures to [`ApiError`].

use ctsync_api::ApiError;
use serde::Deserialize;

const MAX_BODY_IN_MESSAGE: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorObject {
    code: String,
    #[serde(default)]
    current_version: Option<u64>,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    duplicate_value: Option<serde_json::Value>,
}

/// Classifies a non-success response.
///
/// Version conflicts and duplicate keys are recognized by their error code;
/// everything else becomes [`ApiError::Http`] with the (truncated) body.
pub fn map_error_response(status: u16, body: &str, url: &str) -> ApiError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();

    if let Some(response) = &parsed {
        if let Some(conflict) = response
            .errors
            .iter()
            .find(|error| error.code == "ConcurrentModification")
        {
            return ApiError::ConcurrentModification {
                current_version: conflict.current_version,
            };
        }
        if let Some(key) = response.errors.iter().find_map(|error| {
            match (error.code.as_str(), error.field.as_deref(), &error.duplicate_value) {
                ("DuplicateField", Some("key"), Some(value)) => Some(match value {
                    serde_json::Value::String(key) => key.clone(),
                    other => other.to_string(),
                }),
                _ => None,
            }
        }) {
            return ApiError::DuplicateKey { key };
        }
    }
    if status == 409 {
        return ApiError::ConcurrentModification {
            current_version: None,
        };
    }

    let detail = parsed
        .and_then(|response| response.message)
        .unwrap_or_else(|| truncate(body));
    ApiError::http(status, format!("{} from {}", detail, url))
}

/// Better error messages for transport failures.
pub fn map_reqwest_error(e: reqwest::Error, url: &str, operation: &str) -> ApiError {
    if e.is_timeout() {
        ApiError::network(format!(
            "Failed to {} for {}: timeout - request took too long (check network or increase timeout)",
            operation, url
        ))
    } else if e.is_connect() {
        ApiError::network(format!(
            "Failed to {} for {}: connection error - check network connectivity and DNS resolution. Error: {}",
            operation, url, e
        ))
    } else if e.is_decode() {
        ApiError::decode(format!(
            "Failed to {} for {}: unexpected response format from server. Error: {}",
            operation, url, e
        ))
    } else {
        ApiError::network(format!("Failed to {} for {}: {}", operation, url, e))
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_BODY_IN_MESSAGE {
        let head: String = body.chars().take(MAX_BODY_IN_MESSAGE).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}
