pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod lookup;
pub mod provider;
pub mod server;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{AppConfig, Settings};
use crate::error::FetchError;
use crate::fetch::{HttpFetcher, PageFetcher};

pub use types::*;

/// Long-lived context shared by the session and the host bridge: settings,
/// the network client and the page cache.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub settings: Arc<Settings>,
    pub fetcher: Arc<dyn PageFetcher>,
    // Successful page bodies, key: url
    pub page_cache: Option<moka::future::Cache<String, String>>,
}

impl AppState {
    pub fn new(config: AppConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let page_cache = (config.page_cache_ttl_secs > 0).then(|| {
            moka::future::Cache::builder()
                .max_capacity(1_000)
                .time_to_live(Duration::from_secs(config.page_cache_ttl_secs))
                .build()
        });
        Self {
            settings: Arc::new(Settings::new(config.configuration)),
            config,
            fetcher,
            page_cache,
        }
    }

    /// Context backed by a real HTTP client built from `config`.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::from_config(&config)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Fetch a page, going through the cache when one is configured.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        if let Some(cache) = &self.page_cache {
            if let Some(page) = cache.get(url).await {
                debug!("page cache hit for {}", url);
                return Ok(page);
            }
        }

        let page = self.fetcher.fetch(url).await?;
        if let Some(cache) = &self.page_cache {
            cache.insert(url.to_string(), page.clone()).await;
        }
        Ok(page)
    }

    pub fn teardown(&self) {
        if let Some(cache) = &self.page_cache {
            cache.invalidate_all();
        }
    }
}
