//! Retrieval of status documents from the archiver management interface

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;
use url::Url;

use crate::error::FetchError;

/// Source of raw status documents
///
/// Implementations perform exactly one request per call and never retry;
/// retrying is left to the poll interval of the caller.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Fetch and decode the JSON document at `url`, giving up after `timeout`
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<serde_json::Value, FetchError>;
}

/// HTTP implementation of [`StatusFetcher`]
///
/// The underlying client is shared by every poller, cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<serde_json::Value, FetchError> {
        trace!("requesting {url}");

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        serde_json::from_str(&body).map_err(|e| FetchError::MalformedJson(e.to_string()))
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::ConnectionRefused
    } else {
        FetchError::Transport(err.to_string())
    }
}
