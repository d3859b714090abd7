use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::FetchError;

/// One GET round trip for a dictionary page.
///
/// Implementations do not retry; a failure is final for that lookup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = build_client(&config.user_agent, config.http_timeout())?;
        Ok(Self::new(client))
    }
}

pub fn build_client(user_agent: &str, timeout: Duration) -> anyhow::Result<Client> {
    let client = client_builder(user_agent, timeout).build()?;
    Ok(client)
}

fn client_builder(user_agent: &str, timeout: Duration) -> ClientBuilder {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url)
            .map_err(|e| FetchError::Transport(format!("invalid URL '{}': {}", url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::Transport(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        debug!("GET {}", url);
        let response = self
            .client
            .get(parsed)
            .header("Accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| {
                warn!("Request to {} failed: {}", url, e);
                FetchError::from(e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("{} answered with status {}", url, status);
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        info!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}
