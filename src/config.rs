use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

pub const DEFAULT_PROTOCOL: &str = "https";
pub const DEFAULT_HOST: &str = "www.wordreference.com";
pub const DEFAULT_USER_AGENT: &str = "GNOME Shell - WordReferenceSearchProvider - extension";

/// Dictionary edition, i.e. the site path used for `d:` lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryVariant {
    #[serde(alias = "definicio")]
    Catalan,
    #[default]
    #[serde(alias = "definition")]
    English,
    #[serde(alias = "definicion")]
    Spanish,
    /// Marks every sense up as `<li class='definition'>`.
    #[serde(alias = "definizione")]
    Italian,
}

impl DictionaryVariant {
    pub fn path_segment(&self) -> &'static str {
        match self {
            DictionaryVariant::Catalan => "definicio",
            DictionaryVariant::English => "definition",
            DictionaryVariant::Spanish => "definicion",
            DictionaryVariant::Italian => "definizione",
        }
    }
}

impl FromStr for DictionaryVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "catalan" | "definicio" => Ok(DictionaryVariant::Catalan),
            "english" | "definition" => Ok(DictionaryVariant::English),
            "spanish" | "definicion" => Ok(DictionaryVariant::Spanish),
            "italian" | "definizione" => Ok(DictionaryVariant::Italian),
            other => Err(format!("unknown dictionary variant: {}", other)),
        }
    }
}

impl fmt::Display for DictionaryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Thesaurus edition, i.e. the site path used for `s:` lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynonymVariant {
    /// Wraps its synonyms in a `clickable engthes` block.
    #[default]
    #[serde(alias = "synonyms")]
    English,
    #[serde(alias = "sinonimos")]
    Spanish,
}

impl SynonymVariant {
    pub fn path_segment(&self) -> &'static str {
        match self {
            SynonymVariant::English => "synonyms",
            SynonymVariant::Spanish => "sinonimos",
        }
    }
}

impl FromStr for SynonymVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "synonyms" => Ok(SynonymVariant::English),
            "spanish" | "sinonimos" => Ok(SynonymVariant::Spanish),
            other => Err(format!("unknown synonym variant: {}", other)),
        }
    }
}

impl fmt::Display for SynonymVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// The user-editable part of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub dictionary: DictionaryVariant,
    #[serde(default)]
    pub synonyms: SynonymVariant,
}

/// Where lookups are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: String,
    pub host: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL.to_string(),
            host: DEFAULT_HOST.to_string(),
        }
    }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub configuration: Configuration,
    pub endpoint: Endpoint,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub debounce_ms: u64,
    /// Overrides the `max` the host passes to `filter_results`.
    pub result_limit: Option<usize>,
    /// Zero disables the page cache.
    pub page_cache_ttl_secs: u64,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            configuration: Configuration::default(),
            endpoint: Endpoint::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout_secs: 10,
            debounce_ms: 800,
            result_limit: None,
            page_cache_ttl_secs: 600,
            bind_addr: "127.0.0.1:5000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let dictionary = parse_variant("WORDREF_DICTIONARY", defaults.configuration.dictionary);
        let synonyms = parse_variant("WORDREF_SYNONYMS", defaults.configuration.synonyms);

        let protocol =
            env::var("WORDREF_PROTOCOL").unwrap_or_else(|_| DEFAULT_PROTOCOL.to_string());
        let host = env::var("WORDREF_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let user_agent = env::var("USER_AGENT").unwrap_or(defaults.user_agent);

        let http_timeout_secs = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.http_timeout_secs);

        let debounce_ms = env::var("DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.debounce_ms);

        let result_limit = env::var("RESULT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|limit: &usize| *limit > 0);

        let page_cache_ttl_secs = env::var("PAGE_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.page_cache_ttl_secs);

        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        Self {
            configuration: Configuration {
                dictionary,
                synonyms,
            },
            endpoint: Endpoint { protocol, host },
            user_agent,
            http_timeout_secs,
            debounce_ms,
            result_limit,
            page_cache_ttl_secs,
            bind_addr,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn parse_variant<T>(key: &str, default: T) -> T
where
    T: FromStr<Err = String>,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("{}: {}, using default", key, e);
            default
        }),
        Err(_) => default,
    }
}

/// Live, shared view of the [`Configuration`].
///
/// Readers take a snapshot when they need one; a lookup that is already in
/// flight keeps the snapshot it started with.
#[derive(Debug)]
pub struct Settings {
    current: watch::Sender<Configuration>,
}

impl Settings {
    pub fn new(initial: Configuration) -> Self {
        let (current, _) = watch::channel(initial);
        Self { current }
    }

    pub fn snapshot(&self) -> Configuration {
        *self.current.borrow()
    }

    pub fn update(&self, configuration: Configuration) {
        info!(
            "Settings changed: dictionary={} synonyms={}",
            configuration.dictionary, configuration.synonyms
        );
        self.current.send_replace(configuration);
    }

    /// Change notifications for whoever wants to react to new settings.
    pub fn subscribe(&self) -> watch::Receiver<Configuration> {
        self.current.subscribe()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}
