use super::{ChunkRecord, ChunkStore, GatewayError, StatusGateway};
use crate::config::Config;
use crate::processing::StatusUpdate;
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};

/// JSON client for the storage API that keeps file status and chunk records.
///
/// - `POST {base}/files/{id}/status` receives `{ status, metadata?, errorMessage? }`.
/// - `POST {base}/files/{id}/chunks` receives one chunk and answers `{ success }`.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkPayload<'a> {
    chunk_index: usize,
    text: &'a str,
    embedding: &'a [f32],
    created_at: &'a str,
}

#[derive(Deserialize)]
struct StoreChunkResponse {
    #[serde(default = "default_success")]
    success: bool,
}

fn default_success() -> bool {
    true
}

impl HttpBackend {
    /// Construct a backend from the storage settings in `config`.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        Self::with_base_url(&config.storage_api_url, config.storage_api_key.clone())
    }

    /// Construct a backend for an explicit base URL.
    pub fn with_base_url(base_url: &str, api_key: Option<String>) -> Result<Self, GatewayError> {
        let client = Client::builder().user_agent("docembed/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(GatewayError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().is_some_and(|value| !value.is_empty()),
            "Initialized storage API client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<reqwest::RequestBuilder, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.bearer_auth(api_key);
        }
        Ok(req)
    }

    async fn ensure_success(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GatewayError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = GatewayError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Storage API request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl StatusGateway for HttpBackend {
    async fn report_status(
        &self,
        request_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), GatewayError> {
        let response = self
            .request(Method::POST, &["files", request_id, "status"])?
            .json(update)
            .send()
            .await?;
        self.ensure_success(response).await?;
        tracing::debug!(request_id, status = %update.status, "Status reported");
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for HttpBackend {
    async fn store_chunk(&self, record: ChunkRecord<'_>) -> Result<bool, GatewayError> {
        let payload = ChunkPayload {
            chunk_index: record.chunk_index,
            text: record.text,
            embedding: record.embedding,
            created_at: record.created_at,
        };
        let response = self
            .request(Method::POST, &["files", record.request_id, "chunks"])?
            .json(&payload)
            .send()
            .await?;
        let response = self.ensure_success(response).await?;
        let body: StoreChunkResponse = response.json().await?;
        tracing::trace!(
            request_id = record.request_id,
            chunk_index = record.chunk_index,
            success = body.success,
            "Chunk stored"
        );
        Ok(body.success)
    }
}

fn normalize_base_url(url: &str) -> Result<Url, String> {
    let mut parsed = Url::parse(url).map_err(|err| err.to_string())?;
    if parsed.cannot_be_a_base() {
        return Err(format!("{url} cannot be used as a base URL"));
    }
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_paths_are_appended_and_encoded() {
        let backend =
            HttpBackend::with_base_url("http://storage.local/api/", None).expect("backend");
        let request = backend
            .request(Method::POST, &["files", "doc 1/2", "status"])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://storage.local/api/files/doc%201%2F2/status"
        );
    }

    #[test]
    fn api_key_is_sent_as_bearer_token() {
        let backend =
            HttpBackend::with_base_url("http://storage.local", Some("s3cret".into())).unwrap();
        let request = backend
            .request(Method::POST, &["files", "a", "chunks"])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer s3cret"
        );
        assert_eq!(request.url().path(), "/files/a/chunks");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpBackend::with_base_url("not a url", None),
            Err(GatewayError::InvalidUrl(_))
        ));
    }
}
