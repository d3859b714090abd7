use std::process::ExitStatus;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::ExtractionError;
use crate::session::{SearchOutcome, SearchSession, SessionPhase};
use crate::types::ResultMeta;
use crate::AppState;

pub const PROVIDER_NAME: &str = "WordReference";

/// Pseudo-results shown through the same id channel as real entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Loading,
    Error,
    NothingFound,
}

impl Sentinel {
    pub const ALL: [Sentinel; 3] = [Sentinel::Loading, Sentinel::Error, Sentinel::NothingFound];

    pub fn id(&self) -> &'static str {
        match self {
            Sentinel::Loading => "__loading__",
            Sentinel::Error => "__error__",
            Sentinel::NothingFound => "__nothing_found__",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Sentinel::Loading => "Loading items from WordReference, please wait...",
            Sentinel::Error => "Oops, an error occurred while searching.",
            Sentinel::NothingFound => "Oops, I didn't find what you are looking for.",
        }
    }

    pub fn meta(&self) -> ResultMeta {
        ResultMeta {
            id: self.id().to_string(),
            name: PROVIDER_NAME.to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Opens a result's page outside the shell.
pub trait Launcher: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Hands the URL to the desktop's default handler.
///
/// Must be called inside a tokio runtime.
pub struct XdgOpen;

impl Launcher for XdgOpen {
    fn open(&self, url: &str) -> std::io::Result<()> {
        spawn_and_reap("xdg-open", url)?;
        Ok(())
    }
}

/// Start `program url` and wait on it in the background so the child is
/// reaped and its exit status logged.
fn spawn_and_reap(
    program: &str,
    url: &str,
) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = tokio::process::Command::new(program).arg(url).spawn()?;
    let program = program.to_string();
    let url = url.to_string();
    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if status.success() => {
                debug!("{} finished for {}", program, url);
                Some(status)
            }
            Ok(status) => {
                warn!("{} exited with {} for {}", program, status, url);
                Some(status)
            }
            Err(e) => {
                warn!("Waiting on {} for {} failed: {}", program, url, e);
                None
            }
        }
    }))
}

/// The four calls a desktop search host makes into the provider.
pub struct SearchProvider {
    session: SearchSession,
    launcher: Arc<dyn Launcher>,
    result_limit: Option<usize>,
}

impl SearchProvider {
    pub fn new(state: Arc<AppState>, launcher: Arc<dyn Launcher>) -> Result<Self, ExtractionError> {
        let result_limit = state.config.result_limit;
        Ok(Self {
            session: SearchSession::new(state)?,
            launcher,
            result_limit,
        })
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn settings(&self) -> &Settings {
        &self.session.state().settings
    }

    /// Ids to show for `terms`, or `None` if a newer query took over and the
    /// host should not be called back.
    pub async fn initial_search<S: AsRef<str>>(&self, terms: &[S]) -> Option<Vec<String>> {
        match self.session.search(terms).await {
            SearchOutcome::Applied(ids) => Some(ids),
            SearchOutcome::NothingFound => Some(vec![Sentinel::NothingFound.id().to_string()]),
            SearchOutcome::Failed(e) => {
                error!("Lookup failed: {}", e);
                Some(vec![Sentinel::Error.id().to_string()])
            }
            SearchOutcome::Discarded => None,
        }
    }

    /// Refining a query is just a new lookup; previous ids say nothing about
    /// what the site returns for the longer word.
    pub async fn subsearch<S: AsRef<str>>(
        &self,
        _previous: &[String],
        terms: &[S],
    ) -> Option<Vec<String>> {
        self.initial_search(terms).await
    }

    /// Ids the host can show right away while a lookup is pending.
    pub fn pending_ids(&self) -> Vec<String> {
        match self.session.phase() {
            SessionPhase::Idle => Vec::new(),
            SessionPhase::Debouncing | SessionPhase::InFlight => {
                vec![Sentinel::Loading.id().to_string()]
            }
        }
    }

    /// Unknown ids are skipped.
    pub async fn get_result_metas(&self, ids: &[String]) -> Vec<ResultMeta> {
        let mut metas = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(sentinel) = Sentinel::from_id(id) {
                metas.push(sentinel.meta());
                continue;
            }
            match self.session.entry(id).await {
                Some(entry) => metas.push(ResultMeta {
                    id: entry.id,
                    name: entry.description,
                    description: entry.label,
                }),
                None => debug!("No entry for id {}", id),
            }
        }
        metas
    }

    /// Open the entry's page. Returns false for sentinels and unknown ids.
    pub async fn activate(&self, id: &str) -> std::io::Result<bool> {
        if Sentinel::from_id(id).is_some() {
            return Ok(false);
        }
        let Some(entry) = self.session.entry(id).await else {
            debug!("Activate for unknown id {}", id);
            return Ok(false);
        };
        info!("Opening {}", entry.source_url);
        self.launcher.open(&entry.source_url)?;
        Ok(true)
    }

    pub fn filter_results(&self, ids: &[String], max: usize) -> Vec<String> {
        let limit = self.result_limit.unwrap_or(max);
        ids.iter().take(limit).cloned().collect()
    }

    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}
