//! Search state and the browse/search view switch.
//!
//! Every query change bumps a generation counter. A response is applied only
//! if its generation is still current when it arrives, so the last query
//! issued always wins regardless of network completion order.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use phenoscope_common::{Result, TermId, TermRecord};
use phenoscope_sources::{SearchLimit, SearchLimits, TermSource};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::highlight::{highlight, Span};
use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Browsing,
    Searching,
}

/// One flat search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: TermId,
    pub label: String,
    /// Source fields beyond id and name, untouched.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// What became of one `set_query` / `commit_query` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Empty query: results cleared, back to browsing.
    Cleared,
    /// Results for this generation are now displayed.
    Applied { generation: u64, hits: usize },
    /// A newer query was issued first; this one was dropped.
    Superseded { generation: u64 },
}

#[derive(Debug)]
struct SearchState {
    query: String,
    generation: u64,
    mode: ViewMode,
    results: Vec<SearchHit>,
    /// Generation whose results are in `results`.
    applied: Option<u64>,
    /// Generation still waiting on the debounce or the source.
    pending: Option<u64>,
}

pub struct SearchController {
    source: Arc<dyn TermSource>,
    limits: SearchLimits,
    debounce: Duration,
    state: Mutex<SearchState>,
}

impl SearchController {
    pub fn new(source: Arc<dyn TermSource>, debounce: Duration) -> Self {
        let limits = source.search_limits();
        Self {
            source,
            limits,
            debounce,
            state: Mutex::new(SearchState {
                query: String::new(),
                generation: 0,
                mode: ViewMode::Browsing,
                results: Vec::new(),
                applied: None,
                pending: None,
            }),
        }
    }

    /// Type-ahead entry point: waits out the debounce period, then searches
    /// unless another query arrived meanwhile.
    pub async fn set_query(&self, text: &str) -> Result<SearchOutcome> {
        let Some(generation) = self.begin(text) else {
            return Ok(SearchOutcome::Cleared);
        };

        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
            if !self.is_current(generation) {
                debug!(generation, "Query replaced during debounce; not sent");
                return Ok(SearchOutcome::Superseded { generation });
            }
        }

        self.run(generation, text, self.limits.typeahead).await
    }

    /// Explicit submit: searches immediately with the submit limit.
    pub async fn commit_query(&self, text: &str) -> Result<SearchOutcome> {
        let Some(generation) = self.begin(text) else {
            return Ok(SearchOutcome::Cleared);
        };
        self.run(generation, text, self.limits.submit).await
    }

    /// Record the new query. Returns its generation, or `None` for an empty
    /// query, which switches straight back to browsing.
    fn begin(&self, text: &str) -> Option<u64> {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.query = text.to_string();

        if text.is_empty() {
            state.results.clear();
            state.applied = None;
            state.pending = None;
            if state.mode == ViewMode::Searching {
                info!("Search cleared; back to browsing");
            }
            state.mode = ViewMode::Browsing;
            return None;
        }

        state.mode = ViewMode::Searching;
        state.pending = Some(state.generation);
        Some(state.generation)
    }

    #[instrument(skip(self, limit))]
    async fn run(&self, generation: u64, text: &str, limit: SearchLimit) -> Result<SearchOutcome> {
        let response = self.source.search(text, limit).await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!(current = state.generation, "Discarding stale search response");
            return Ok(SearchOutcome::Superseded { generation });
        }
        state.pending = None;

        let records = response.inspect_err(|e| {
            warn!(error = %e, "Search failed; keeping previous results");
        })?;

        state.results = records.into_iter().map(|r| self.to_hit(r)).collect();
        state.applied = Some(generation);
        let hits = state.results.len();
        info!(hits, "Search results applied");
        Ok(SearchOutcome::Applied { generation, hits })
    }

    fn to_hit(&self, record: TermRecord) -> SearchHit {
        let label = self.source.label(&record);
        SearchHit { id: record.id, label, extra: record.extra }
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.state).generation == generation
    }

    pub fn query(&self) -> String {
        lock(&self.state).query.clone()
    }

    pub fn mode(&self) -> ViewMode {
        lock(&self.state).mode
    }

    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    /// Generation of the results currently held, if any.
    pub fn applied_generation(&self) -> Option<u64> {
        lock(&self.state).applied
    }

    /// Whether the current query has not produced a result or error yet.
    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    pub fn results(&self) -> Vec<SearchHit> {
        lock(&self.state).results.clone()
    }

    /// Highlight spans for `label` under the current query.
    pub fn highlight(&self, label: &str) -> Vec<Span> {
        highlight(label, &lock(&self.state).query)
    }
}
