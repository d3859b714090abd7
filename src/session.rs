use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::{ExtractionError, SearchError};
use crate::extract::ResultExtractor;
use crate::lookup::{build_url, classify};
use crate::store::ResultStore;
use crate::types::{DictionaryEntry, LookupRequest};
use crate::AppState;

/// What the session is doing on behalf of the newest query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Debouncing,
    InFlight,
}

/// How a single query ended.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Store now holds these ids. Empty when the query was not ours.
    Applied(Vec<String>),
    /// The page was fetched and parsed but held no entries.
    NothingFound,
    /// Fetch or extraction failed; the store was left alone.
    Failed(SearchError),
    /// A newer query arrived first. Nothing was touched and the host must not
    /// be called back.
    Discarded,
}

/// Debounced, single-flight lookups feeding a [`ResultStore`].
///
/// Every query bumps a generation counter. A lookup only gets to write the
/// store if the counter still holds its own generation when it finishes, so an
/// older response can never overwrite a newer one.
pub struct SearchSession {
    state: Arc<AppState>,
    extractor: ResultExtractor,
    debounce: Duration,
    store: Mutex<ResultStore>,
    generation: watch::Sender<u64>,
    phase: watch::Sender<SessionPhase>,
    closed: AtomicBool,
}

impl SearchSession {
    pub fn new(state: Arc<AppState>) -> Result<Self, ExtractionError> {
        let (generation, _) = watch::channel(0);
        let (phase, _) = watch::channel(SessionPhase::Idle);
        Ok(Self {
            debounce: state.config.debounce(),
            state,
            extractor: ResultExtractor::new()?,
            store: Mutex::new(ResultStore::new()),
            generation,
            phase,
            closed: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Handle one query event from the host.
    pub async fn search<S: AsRef<str>>(&self, terms: &[S]) -> SearchOutcome {
        if self.closed.load(Ordering::SeqCst) {
            warn!("Search after shutdown ignored");
            return SearchOutcome::Discarded;
        }

        let token = self.advance();
        self.set_phase(token, SessionPhase::Debouncing);
        if !self.debounce(token).await {
            debug!("Query #{} superseded while debouncing", token);
            return SearchOutcome::Discarded;
        }

        let Some(request) = classify(terms) else {
            debug!("Query #{} is not a dictionary lookup", token);
            self.set_phase(token, SessionPhase::Idle);
            return SearchOutcome::Applied(Vec::new());
        };

        let config = self.state.settings.snapshot();
        let url = build_url(&self.state.config.endpoint, &request, &config);
        info!("Query #{}: {:?} '{}' -> {}", token, request.mode, request.word, url);

        self.set_phase(token, SessionPhase::InFlight);
        let result = self.lookup(&request, &config, &url).await;
        self.complete(token, result).await
    }

    /// Entry from the latest applied lookup.
    pub async fn entry(&self, id: &str) -> Option<DictionaryEntry> {
        self.store.lock().await.get(id).cloned()
    }

    /// Stop accepting queries, drop whatever is in flight and release the
    /// shared context.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.advance();
        self.store.lock().await.clear();
        self.phase.send_replace(SessionPhase::Idle);
        self.state.teardown();
        info!("Search session closed");
    }

    fn advance(&self) -> u64 {
        let mut token = 0;
        self.generation.send_modify(|generation| {
            *generation += 1;
            token = *generation;
        });
        token
    }

    fn is_current(&self, token: u64) -> bool {
        *self.generation.borrow() == token
    }

    fn set_phase(&self, token: u64, phase: SessionPhase) {
        if self.is_current(token) {
            self.phase.send_replace(phase);
        }
    }

    /// Wait out the debounce delay. False if a newer query showed up meanwhile.
    async fn debounce(&self, token: u64) -> bool {
        let mut changes = self.generation.subscribe();
        if *changes.borrow_and_update() != token {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.debounce) => self.is_current(token),
            _ = changes.changed() => false,
        }
    }

    async fn lookup(
        &self,
        request: &LookupRequest,
        config: &Configuration,
        url: &str,
    ) -> Result<Vec<DictionaryEntry>, SearchError> {
        let page = self.state.fetch_page(url).await?;
        let entries = self.extractor.extract(&page, request, config, url)?;
        Ok(entries)
    }

    async fn complete(
        &self,
        token: u64,
        result: Result<Vec<DictionaryEntry>, SearchError>,
    ) -> SearchOutcome {
        let mut store = self.store.lock().await;
        if !self.is_current(token) {
            debug!("Discarding stale response for query #{}", token);
            return SearchOutcome::Discarded;
        }
        self.phase.send_replace(SessionPhase::Idle);

        match result {
            Ok(entries) if entries.is_empty() => {
                info!("Query #{} found nothing", token);
                SearchOutcome::NothingFound
            }
            Ok(entries) => {
                let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
                store.replace(entries);
                info!("Query #{} applied {} results", token, ids.len());
                SearchOutcome::Applied(ids)
            }
            Err(e) => {
                warn!("Query #{} failed: {}", token, e);
                SearchOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, DictionaryVariant};
    use crate::error::FetchError;
    use crate::testing::{test_config, test_state, ScriptedFetcher};

    const HOUSE: &str = "https://www.wordreference.com/definition/house";
    const HOUSE_PAGE: &str = "<ol><li>a building</li><li>a home</li></ol>";

    async fn delayed(session: &SearchSession, delay_ms: u64, terms: &[&str]) -> SearchOutcome {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        session.search(terms).await
    }

    fn applied(outcome: &SearchOutcome) -> Option<&[String]> {
        match outcome {
            SearchOutcome::Applied(ids) => Some(ids),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_query_is_empty_without_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let session = SearchSession::new(test_state(fetcher.clone())).unwrap();

        let empty: [&str; 0] = [];
        let outcome = session.search(&empty).await;
        assert_eq!(applied(&outcome), Some(&[][..]));

        let outcome = session.search(&["house"]).await;
        assert_eq!(applied(&outcome), Some(&[][..]));

        assert!(fetcher.calls().is_empty());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_is_classified_after_debounce() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HOUSE, 50, HOUSE_PAGE));
        let session = SearchSession::new(test_state(fetcher.clone())).unwrap();

        let (plain, lookup) = tokio::join!(
            session.search(&["hous"]),
            delayed(&session, 100, &["d:house"])
        );

        assert!(matches!(plain, SearchOutcome::Discarded));
        assert_eq!(
            applied(&lookup),
            Some(&["index_0".to_string(), "index_1".to_string()][..])
        );
        assert_eq!(fetcher.calls(), vec![HOUSE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_definition_lookup_populates_store() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HOUSE, 50, HOUSE_PAGE));
        let session = SearchSession::new(test_state(fetcher.clone())).unwrap();

        let outcome = session.search(&["d:house"]).await;

        assert_eq!(
            applied(&outcome),
            Some(&["index_0".to_string(), "index_1".to_string()][..])
        );
        assert_eq!(fetcher.calls(), vec![HOUSE.to_string()]);

        let entry = session.entry("index_1").await.unwrap();
        assert_eq!(entry.description, "a home");
        assert_eq!(entry.label, "house");
        assert_eq!(entry.source_url, HOUSE);
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_queries_fetch_once() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HOUSE, 50, HOUSE_PAGE));
        let session = SearchSession::new(test_state(fetcher.clone())).unwrap();

        let (a, b, c, d, e) = tokio::join!(
            delayed(&session, 0, &["d:h"]),
            delayed(&session, 100, &["d:ho"]),
            delayed(&session, 200, &["d:hou"]),
            delayed(&session, 300, &["d:hous"]),
            delayed(&session, 400, &["d:house"]),
        );

        for outcome in [a, b, c, d] {
            assert!(matches!(outcome, SearchOutcome::Discarded));
        }
        assert!(applied(&e).is_some());
        assert_eq!(fetcher.calls(), vec![HOUSE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_response_is_discarded() {
        let alpha = "https://www.wordreference.com/definition/alpha";
        let beta = "https://www.wordreference.com/definition/beta";
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(alpha, 5_000, "<ol><li>first letter</li></ol>")
                .page(beta, 100, "<ol><li>second letter</li></ol>"),
        );
        let session = SearchSession::new(test_state(fetcher.clone())).unwrap();

        // alpha is dispatched at 800ms and answers at 5800ms; beta arrives at
        // 1000ms and answers at 1900ms.
        let (first, second) = tokio::join!(
            delayed(&session, 0, &["d:alpha"]),
            delayed(&session, 1_000, &["d:beta"]),
        );

        assert!(matches!(first, SearchOutcome::Discarded));
        assert_eq!(applied(&second), Some(&["index_0".to_string()][..]));
        assert_eq!(fetcher.calls(), vec![alpha.to_string(), beta.to_string()]);

        let entry = session.entry("index_0").await.unwrap();
        assert_eq!(entry.description, "second letter");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_failure_is_discarded_too() {
        let alpha = "https://www.wordreference.com/definition/alpha";
        let fetcher = Arc::new(ScriptedFetcher::new().failure(
            alpha,
            2_000,
            FetchError::Transport("connection reset".into()),
        ));
        let session = SearchSession::new(test_state(fetcher.clone())).unwrap();

        let (first, second) = tokio::join!(
            delayed(&session, 0, &["d:alpha"]),
            delayed(&session, 1_000, &["hello"]),
        );

        assert!(matches!(first, SearchOutcome::Discarded));
        assert_eq!(applied(&second), Some(&[][..]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_error_leaves_store_alone() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HOUSE, 10, HOUSE_PAGE));
        let session = SearchSession::new(test_state(fetcher.clone())).unwrap();

        assert!(applied(&session.search(&["d:house"]).await).is_some());

        let outcome = session.search(&["d:missing"]).await;
        assert!(matches!(
            outcome,
            SearchOutcome::Failed(SearchError::Fetch(FetchError::HttpStatus(404)))
        ));
        assert_eq!(
            session.entry("index_0").await.map(|e| e.description),
            Some("a building".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_page_is_nothing_found() {
        let url = "https://www.wordreference.com/definition/zzzz";
        let fetcher = Arc::new(ScriptedFetcher::new().page(url, 10, "<p>No results</p>"));
        let session = SearchSession::new(test_state(fetcher)).unwrap();

        let outcome = session.search(&["d:zzzz"]).await;
        assert!(matches!(outcome, SearchOutcome::NothingFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_page_is_failure() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HOUSE, 10, "<ol><li>a building"));
        let session = SearchSession::new(test_state(fetcher)).unwrap();

        let outcome = session.search(&["d:house"]).await;
        assert!(matches!(
            outcome,
            SearchOutcome::Failed(SearchError::Extraction(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_change_applies_to_next_lookup() {
        let italian = "https://www.wordreference.com/definizione/casa";
        let fetcher = Arc::new(ScriptedFetcher::new().page(
            italian,
            10,
            "<ol>\n<li class='definition'>edificio</li>\n</ol>",
        ));
        let session = SearchSession::new(test_state(fetcher.clone())).unwrap();

        session.state().settings.update(Configuration {
            dictionary: DictionaryVariant::Italian,
            ..Configuration::default()
        });
        let outcome = session.search(&["d:casa"]).await;

        assert_eq!(applied(&outcome), Some(&["index_0".to_string()][..]));
        assert_eq!(fetcher.calls(), vec![italian.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_cache_skips_second_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HOUSE, 10, HOUSE_PAGE));
        let config = AppConfig {
            page_cache_ttl_secs: 60,
            ..test_config()
        };
        let state = Arc::new(AppState::new(config, fetcher.clone()));
        let session = SearchSession::new(state).unwrap();

        assert!(applied(&session.search(&["d:house"]).await).is_some());
        assert!(applied(&session.search(&["d:house"]).await).is_some());
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_in_flight_and_refuses_new_queries() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HOUSE, 2_000, HOUSE_PAGE));
        let session = SearchSession::new(test_state(fetcher)).unwrap();

        let shutdown_later = async {
            tokio::time::sleep(Duration::from_millis(1_000)).await;
            session.shutdown().await;
        };
        let (outcome, _) = tokio::join!(session.search(&["d:house"]), shutdown_later);

        assert!(matches!(outcome, SearchOutcome::Discarded));
        assert!(matches!(
            session.search(&["d:house"]).await,
            SearchOutcome::Discarded
        ));
        assert!(session.entry("index_0").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_tracks_newest_query() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HOUSE, 500, HOUSE_PAGE));
        let session = SearchSession::new(test_state(fetcher)).unwrap();
        let mut phases = session.subscribe_phase();

        let observe = async {
            let mut seen = Vec::new();
            while seen.last() != Some(&SessionPhase::Idle) || seen.len() < 2 {
                if phases.changed().await.is_err() {
                    break;
                }
                seen.push(*phases.borrow_and_update());
            }
            seen
        };
        let (_, seen) = tokio::join!(session.search(&["d:house"]), observe);

        assert_eq!(
            seen,
            vec![SessionPhase::Debouncing, SessionPhase::InFlight, SessionPhase::Idle]
        );
    }
}
