// ─── HTTP collaborator ───
// Every network read in the crate goes through `HttpFetch`, so installers can
// be driven by a real `reqwest` client or by a fixture in tests.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

pub const APP_USER_AGENT: &str = concat!("launcher-core/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(default_headers)
        .build()
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET `url` and return the full body. Non-2xx is `DownloadFailed`.
    async fn get_bytes(&self, url: &str) -> LauncherResult<Vec<u8>>;

    /// HEAD `url` and return the status code, whatever it is.
    async fn head_status(&self, url: &str) -> LauncherResult<u16>;
}

/// GET `url` and deserialize the body as JSON.
pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn HttpFetch,
    url: &str,
) -> LauncherResult<T> {
    let bytes = fetcher.get_bytes(url).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `HttpFetch` backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_user_agent(user_agent: &str) -> LauncherResult<Self> {
        Ok(Self::new(build_http_client(user_agent)?))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> LauncherError {
    LauncherError::DownloadFailed {
        url: url.to_string(),
        reason: err.to_string(),
        status: err.status().map(|s| s.as_u16()),
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
                status: Some(status.as_u16()),
            });
        }

        let mut body = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.map_err(|e| transport_error(url, e))?);
        }

        debug!("GET {} ({} bytes)", url, body.len());
        Ok(body)
    }

    async fn head_status(&self, url: &str) -> LauncherResult<u16> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        Ok(response.status().as_u16())
    }
}
