//! Shared testing utilities for the Phenoscope workspace.
//!
//! [`ScriptedSource`] is an in-memory [`TermSource`] whose answers are set up
//! front. It counts every call and can hold a request behind a gate so tests
//! can force responses to complete out of order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use phenoscope_common::{PhenoscopeError, Result, TermId, TermRecord};
use phenoscope_sources::{SearchLimit, SearchLimits, TermSource};
use tokio::sync::Notify;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Shorthand for building `{id, name}` records in tests.
pub fn rec(id: &str, name: &str) -> TermRecord {
    TermRecord::new(id, name)
}

#[derive(Default)]
struct Script {
    children: HashMap<TermId, Result<Vec<TermRecord>>>,
    searches: HashMap<String, Result<Vec<TermRecord>>>,
    calls: HashMap<String, usize>,
    limits_seen: Vec<(String, SearchLimit)>,
}

pub struct ScriptedSource {
    root: TermRecord,
    limits: SearchLimits,
    script: Mutex<Script>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedSource {
    pub fn new(root_id: &str, root_label: &str) -> Self {
        Self {
            root: rec(root_id, root_label),
            limits: SearchLimits {
                typeahead: SearchLimit::Limited(50),
                submit: SearchLimit::Unlimited,
            },
            script: Mutex::new(Script::default()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// HPO-shaped source rooted at `HP:0000001 "ALL"`.
    pub fn hpo() -> Self {
        Self::new("HP:0000001", "ALL")
    }

    pub fn with_children(&self, id: &str, kids: Vec<TermRecord>) -> &Self {
        self.lock().children.insert(TermId::from(id), Ok(kids));
        self
    }

    pub fn fail_children(&self, id: &str) -> &Self {
        let err = PhenoscopeError::fetch_failed(id, "HTTP 503 Service Unavailable");
        self.lock().children.insert(TermId::from(id), Err(err));
        self
    }

    pub fn with_search(&self, query: &str, hits: Vec<TermRecord>) -> &Self {
        self.lock().searches.insert(query.to_string(), Ok(hits));
        self
    }

    pub fn fail_search(&self, query: &str) -> &Self {
        let err = PhenoscopeError::fetch_failed(query, "connection reset");
        self.lock().searches.insert(query.to_string(), Err(err));
        self
    }

    /// Block `children(id)` until [`release_children`](Self::release_children).
    pub fn hold_children(&self, id: &str) {
        self.hold(children_key(id));
    }

    pub fn release_children(&self, id: &str) {
        self.release(&children_key(id));
    }

    /// Block `search(query)` until [`release_search`](Self::release_search).
    pub fn hold_search(&self, query: &str) {
        self.hold(search_key(query));
    }

    pub fn release_search(&self, query: &str) {
        self.release(&search_key(query));
    }

    pub fn children_calls(&self, id: &str) -> usize {
        self.calls(&children_key(id))
    }

    pub fn search_calls(&self, query: &str) -> usize {
        self.calls(&search_key(query))
    }

    /// Every `(query, limit)` pair sent to `search`, in call order.
    pub fn search_limits_seen(&self) -> Vec<(String, SearchLimit)> {
        self.lock().limits_seen.clone()
    }

    /// Yield until `children(id)` has been entered `n` times.
    pub async fn wait_for_children_calls(&self, id: &str, n: usize) {
        while self.children_calls(id) < n {
            tokio::task::yield_now().await;
        }
    }

    /// Yield until `search(query)` has been entered `n` times.
    pub async fn wait_for_search_calls(&self, query: &str, n: usize) {
        while self.search_calls(query) < n {
            tokio::task::yield_now().await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn calls(&self, key: &str) -> usize {
        self.lock().calls.get(key).copied().unwrap_or(0)
    }

    fn record_call(&self, key: &str) {
        *self.lock().calls.entry(key.to_string()).or_insert(0) += 1;
    }

    fn hold(&self, key: String) {
        self.gates.lock().unwrap().insert(key, Arc::new(Notify::new()));
    }

    fn release(&self, key: &str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(key) {
            // notify_one stores a permit when the request has not reached the gate yet
            gate.notify_one();
        }
    }

    async fn pass_gate(&self, key: &str) {
        let gate = self.gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

fn children_key(id: &str) -> String {
    format!("children:{}", id)
}

fn search_key(query: &str) -> String {
    format!("search:{}", query)
}

#[async_trait]
impl TermSource for ScriptedSource {
    fn root(&self) -> TermRecord {
        self.root.clone()
    }

    async fn children(&self, id: &TermId) -> Result<Vec<TermRecord>> {
        let key = children_key(id.as_str());
        self.record_call(&key);
        self.pass_gate(&key).await;
        self.lock()
            .children
            .get(id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn search(&self, query: &str, limit: SearchLimit) -> Result<Vec<TermRecord>> {
        let key = search_key(query);
        self.record_call(&key);
        self.lock().limits_seen.push((query.to_string(), limit));
        self.pass_gate(&key).await;
        self.lock()
            .searches
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn search_limits(&self) -> SearchLimits {
        self.limits
    }
}
