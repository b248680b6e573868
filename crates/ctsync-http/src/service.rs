//! [`ResourceService`] and [`KeyLookup`] over the REST API.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use ctsync::core::batch::KEY_LOOKUP_CHUNK_SIZE;
use ctsync::{
    CategoryResource, KeyLookup, ProductResource, ResourceKind, ResourceService,
    TaxCategoryResource,
};
use ctsync_api::{ApiError, KeyedResource, PagedQueryResponse, ReferenceTypeId};

use crate::client::CtpClient;

const PAGE_LIMIT: usize = 500;

/// A resource kind reachable under `/{project}/{ENDPOINT}`.
pub trait HttpResource: ResourceKind {
    const ENDPOINT: &'static str;
}

impl HttpResource for CategoryResource {
    const ENDPOINT: &'static str = "categories";
}

impl HttpResource for ProductResource {
    const ENDPOINT: &'static str = "products";
}

impl HttpResource for TaxCategoryResource {
    const ENDPOINT: &'static str = "tax-categories";
}

/// `field in ("a", "b")` with quotes and backslashes escaped.
pub fn in_predicate<'a>(field: &str, values: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values
        .into_iter()
        .map(|value| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{} in ({})", field, quoted.join(", "))
}

/// `{endpoint_url}/key={key}` with the key percent-encoded as one path
/// segment.
pub fn key_url(endpoint_url: &str, key: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(endpoint_url)
        .map_err(|e| ApiError::network(format!("Invalid URL {}: {}", endpoint_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::network(format!("URL {} cannot have a path", endpoint_url)))?
        .push(&format!("key={}", key));
    Ok(url)
}

#[derive(Serialize)]
struct UpdateRequest<'a, A> {
    version: u64,
    actions: &'a [A],
}

impl CtpClient {
    /// Pages through a query until a short page comes back.
    async fn query_all<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        predicate: &str,
    ) -> Result<Vec<T>, ApiError> {
        let url = self.resource_url(endpoint);
        let mut results = Vec::new();
        let mut offset = 0;
        loop {
            let query = [
                ("where", predicate.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
                ("offset", offset.to_string()),
                ("withTotal", "false".to_string()),
            ];
            let page: PagedQueryResponse<T> = self
                .get_json(&url, &query, "query resources")
                .await?
                .ok_or_else(|| ApiError::NotFound {
                    resource: endpoint.to_string(),
                    key: predicate.to_string(),
                })?;
            let fetched = page.results.len();
            results.extend(page.results);
            if fetched < PAGE_LIMIT {
                return Ok(results);
            }
            offset += fetched;
        }
    }
}

#[async_trait]
impl<R> ResourceService<R> for CtpClient
where
    R: HttpResource,
    R::Draft: Serialize,
    R::Current: DeserializeOwned,
    R::Action: Serialize,
{
    async fn fetch_matching_by_keys(
        &self,
        keys: &HashSet<String>,
    ) -> Result<Vec<R::Current>, ApiError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut sorted: Vec<&str> = keys.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let predicate = in_predicate("key", sorted);
        let found: Vec<R::Current> = self.query_all(R::ENDPOINT, &predicate).await?;
        debug!(
            "[CtpClient] {} of {} {} key(s) exist",
            found.len(),
            keys.len(),
            R::RESOURCE_NAME
        );
        Ok(found)
    }

    async fn fetch_by_key(&self, key: &str) -> Result<Option<R::Current>, ApiError> {
        let url = key_url(&self.resource_url(R::ENDPOINT), key)?;
        self.get_json(url.as_str(), &[], "fetch resource by key").await
    }

    async fn create(&self, draft: &R::Draft) -> Result<R::Current, ApiError> {
        let url = self.resource_url(R::ENDPOINT);
        self.post_json(&url, draft, "create resource").await
    }

    async fn update(
        &self,
        id: &str,
        version: u64,
        actions: &[R::Action],
    ) -> Result<R::Current, ApiError> {
        let url = format!("{}/{}", self.resource_url(R::ENDPOINT), id);
        let body = UpdateRequest { version, actions };
        self.post_json(&url, &body, "update resource").await
    }
}

#[async_trait]
impl KeyLookup for CtpClient {
    async fn fetch_keys_by_ids(
        &self,
        type_id: ReferenceTypeId,
        ids: &[String],
    ) -> Result<HashMap<String, String>, ApiError> {
        let mut keys = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(KEY_LOOKUP_CHUNK_SIZE) {
            let predicate = in_predicate("id", chunk.iter().map(String::as_str));
            let found: Vec<KeyedResource> = self.query_all(type_id.endpoint(), &predicate).await?;
            keys.extend(
                found
                    .into_iter()
                    .filter_map(|resource| Some((resource.id, resource.key?))),
            );
        }
        Ok(keys)
    }
}
