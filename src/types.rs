use serde::{Deserialize, Serialize};

use crate::config::Configuration;

/// Which kind of page a query asks for, picked by its `d:` / `s:` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    Definition,
    Synonym,
}

impl LookupMode {
    pub fn prefix(&self) -> &'static str {
        match self {
            LookupMode::Definition => "d:",
            LookupMode::Synonym => "s:",
        }
    }
}

/// A classified query. The word is always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub mode: LookupMode,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub id: String,
    pub label: String,
    pub source_url: String,
    pub description: String,
}

/// What the host renders for a single result id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub id: String,
    pub name: String,
    pub description: String,
}

// Host bridge payloads

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub terms: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub ids: Vec<String>,
    /// True when a newer query replaced this one before it finished.
    pub superseded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubsearchRequest {
    /// Ids the host is currently showing for the shorter query.
    #[serde(default)]
    pub previous: Vec<String>,
    #[serde(default)]
    pub terms: Vec<String>,
}

/// Ids to show while a lookup is still pending.
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingResponse {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetasRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetasResponse {
    pub metas: Vec<ResultMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterRequest {
    pub ids: Vec<String>,
    pub max: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterResponse {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub configuration: Configuration,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
