//! Retrieval of documents that are referenced by URL instead of sent inline.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Errors raised while downloading a document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP layer failed before a usable response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Remote host answered with a non-success status.
    #[error("Unexpected response ({status}) while downloading {url}")]
    UnexpectedStatus {
        /// HTTP status returned by the remote host.
        status: StatusCode,
        /// Location that was requested.
        url: String,
    },
}

/// Materializes document bytes from a remote location.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Download the full document at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Plain HTTP(S) downloader with an optional static bearer token.
pub struct HttpDocumentFetcher {
    client: Client,
    bearer_token: Option<String>,
}

impl HttpDocumentFetcher {
    /// Build a fetcher; `bearer_token` is attached to every download when present.
    pub fn new(bearer_token: Option<String>) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent("docembed/0.1").build()?;
        Ok(Self {
            client,
            bearer_token,
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: response.status(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        tracing::debug!(url, size = bytes.len(), "Downloaded document");
        Ok(bytes.to_vec())
    }
}
