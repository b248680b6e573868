use anyhow::Context as _;
use ctsync_api::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, field, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::errors::{map_error_response, map_reqwest_error};

const CORRELATION_HEADER: &str = "X-Correlation-ID";

fn default_timeout_secs() -> u64 {
    30
}

/// Connection settings for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    pub project_key: String,
    pub access_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(
        api_url: impl Into<String>,
        project_key: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            project_key: project_key.into(),
            access_token: access_token.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Reads `CTP_API_URL`, `CTP_PROJECT_KEY`, `CTP_ACCESS_TOKEN` and the
    /// optional `CTP_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{} is not set", name))
        };
        let mut config = Self::new(
            required("CTP_API_URL")?,
            required("CTP_PROJECT_KEY")?,
            required("CTP_ACCESS_TOKEN")?,
        );
        if let Some(raw) = lookup("CTP_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("CTP_TIMEOUT_SECS must be a number, got '{}'", raw))?;
        }
        Ok(config)
    }
}

/// Thin REST client. Cloning shares the connection pool.
#[derive(Clone)]
pub struct CtpClient {
    project_url: String,
    default_headers: HeaderMap,
    client: reqwest::Client,
}

impl CtpClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.access_token))
                .context("Invalid access token format")?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            project_url: format!(
                "{}/{}",
                config.api_url.trim_end_matches('/'),
                config.project_key
            ),
            default_headers: headers,
            client,
        })
    }

    pub fn resource_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.project_url, endpoint)
    }

    /// Default headers plus a fresh correlation id and the current trace
    /// context.
    fn request_headers(&self) -> HeaderMap {
        struct HeaderInjector {
            headers: HeaderMap,
        }
        impl opentelemetry::propagation::Injector for HeaderInjector {
            fn set(&mut self, key: &str, value: String) {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(&value),
                ) {
                    self.headers.insert(name, value);
                }
            }
        }

        let mut headers = self.default_headers.clone();
        if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            headers.insert(CORRELATION_HEADER, value);
        }

        let context = Span::current().context();
        let mut injector = HeaderInjector { headers };
        opentelemetry::global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&context, &mut injector);
        });
        injector.headers
    }

    /// GET returning `None` on 404.
    #[tracing::instrument(
        name = "ctp.get",
        skip(self, query),
        fields(http.status_code = field::Empty)
    )]
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        operation: &str,
    ) -> Result<Option<T>, ApiError> {
        debug!("[CtpClient] GET {} ({})", url, operation);
        let response = self
            .client
            .get(url)
            .headers(self.request_headers())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let error = map_reqwest_error(e, url, operation);
                error!("[CtpClient] {}", error);
                error
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            Span::current().record("http.status_code", 404);
            return Ok(None);
        }
        let body = Self::handle_response(response, url).await?;
        Self::decode(&body, url).map(Some)
    }

    #[tracing::instrument(
        name = "ctp.post",
        skip(self, body),
        fields(http.status_code = field::Empty)
    )]
    pub(crate) async fn post_json<B, T>(
        &self,
        url: &str,
        body: &B,
        operation: &str,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("[CtpClient] POST {} ({})", url, operation);
        let response = self
            .client
            .post(url)
            .headers(self.request_headers())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let error = map_reqwest_error(e, url, operation);
                error!("[CtpClient] {}", error);
                error
            })?;

        let body = Self::handle_response(response, url).await?;
        Self::decode(&body, url)
    }

    async fn handle_response(response: reqwest::Response, url: &str) -> Result<String, ApiError> {
        let status = response.status();
        Span::current().record("http.status_code", status.as_u16());
        let body = response.text().await.map_err(|e| {
            ApiError::network(format!("Failed to read response body from {}: {}", url, e))
        })?;

        if !status.is_success() {
            let error = map_error_response(status.as_u16(), &body, url);
            debug!("[CtpClient] {} answered {}: {}", url, status.as_u16(), error);
            return Err(error);
        }
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(body: &str, url: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| {
            error!(
                "[CtpClient] Failed to parse response from {}: {} - Response: {}",
                url,
                e,
                body.chars().take(200).collect::<String>()
            );
            ApiError::decode(format!("{} from {}", e, url))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn resource_urls_are_scoped_to_the_project() -> anyhow::Result<()> {
        let client = CtpClient::new(ClientConfig::new("https://api.example.com/", "shop", "t"))?;
        assert_eq!(
            client.resource_url("categories"),
            "https://api.example.com/shop/categories"
        );
        Ok(())
    }

    #[test]
    fn requests_carry_auth_and_correlation_id() -> anyhow::Result<()> {
        let client = CtpClient::new(ClientConfig::new("https://x", "p", "secret"))?;
        let headers = client.request_headers();
        assert_eq!(headers.get("authorization").map(|v| v.as_bytes()), Some(&b"Bearer secret"[..]));
        let first = headers.get(CORRELATION_HEADER).cloned();
        let second = client.request_headers().get(CORRELATION_HEADER).cloned();
        assert!(first.is_some());
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn invalid_token_is_rejected() {
        assert!(CtpClient::new(ClientConfig::new("https://x", "p", "bad\ntoken")).is_err());
    }

    #[test]
    fn config_from_lookup() -> anyhow::Result<()> {
        let env: HashMap<&str, &str> = [
            ("CTP_API_URL", "https://api"),
            ("CTP_PROJECT_KEY", "shop"),
            ("CTP_ACCESS_TOKEN", "t"),
            ("CTP_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))?;
        assert_eq!(config.project_key, "shop");
        assert_eq!(config.timeout_secs, 5);

        let missing = ClientConfig::from_lookup(|_| None).unwrap_err();
        assert!(missing.to_string().contains("CTP_API_URL"));
        Ok(())
    }

    #[test]
    fn config_deserializes_with_default_timeout() -> anyhow::Result<()> {
        let config: ClientConfig = serde_json::from_str(
            r#"{"api_url":"https://api","project_key":"p","access_token":"t"}"#,
        )?;
        assert_eq!(config.timeout_secs, 30);
        Ok(())
    }
}
