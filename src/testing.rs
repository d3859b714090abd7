//! In-memory collaborators for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::provider::Launcher;
use crate::AppState;

/// Answers from a fixed table after a per-URL delay; unknown URLs are 404s.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, (Duration, Result<String, FetchError>)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, delay_ms: u64, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            (Duration::from_millis(delay_ms), Ok(body.to_string())),
        );
        self
    }

    pub fn failure(mut self, url: &str, delay_ms: u64, err: FetchError) -> Self {
        self.pages
            .insert(url.to_string(), (Duration::from_millis(delay_ms), Err(err)));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some((delay, result)) => {
                tokio::time::sleep(*delay).await;
                result.clone()
            }
            None => Err(FetchError::HttpStatus(404)),
        }
    }
}

/// Remembers every URL it was asked to open.
#[derive(Default)]
pub struct RecordingLauncher {
    opened: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// 800ms debounce, no page cache.
pub fn test_config() -> AppConfig {
    AppConfig {
        page_cache_ttl_secs: 0,
        ..AppConfig::default()
    }
}

pub fn test_state(fetcher: Arc<ScriptedFetcher>) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(), fetcher))
}
