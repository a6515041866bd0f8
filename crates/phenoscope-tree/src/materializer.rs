//! Lazy loading of children into the tree store.
//!
//! At most one children request per node is in flight: callers that ask for
//! a node while its request is pending await the same shared future. Each
//! load runs on its own tokio task, so it completes and clears its in-flight
//! entry even when every caller stops waiting.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use futures::future::{BoxFuture, FutureExt, Shared};
use phenoscope_common::{PhenoscopeError, Result, TermId};
use phenoscope_sources::TermSource;
use tracing::{debug, error, info, instrument, warn};

use crate::store::{MergeReport, NewNode, TreeNode, TreeStore};
use crate::{lock, read, write};

/// How an `ensure_children_loaded` call was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Children were already known; nothing was fetched.
    AlreadyLoaded,
    /// Children were fetched and merged (by this call or one it joined).
    Loaded(MergeReport),
}

type PendingLoad = Shared<BoxFuture<'static, Result<LoadOutcome>>>;

/// Single writer of the tree store.
pub struct TreeMaterializer {
    source: Arc<dyn TermSource>,
    store: Arc<RwLock<TreeStore>>,
    in_flight: Arc<Mutex<HashMap<TermId, PendingLoad>>>,
}

impl TreeMaterializer {
    /// Start a tree holding only the source's root, children unknown.
    pub fn new(source: Arc<dyn TermSource>) -> Self {
        let root = source.root();
        let label = source.label(&root);
        Self {
            source,
            store: Arc::new(RwLock::new(TreeStore::new(root.id, label))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn root_id(&self) -> TermId {
        read(&self.store).root_id().clone()
    }

    /// Current state of a node. Never waits on the network.
    pub fn get_node(&self, id: &TermId) -> Option<TreeNode> {
        read(&self.store).get(id).cloned()
    }

    /// Whether a children request for `id` is pending.
    pub fn is_loading(&self, id: &TermId) -> bool {
        lock(&self.in_flight).contains_key(id)
    }

    /// Snapshot of the nodes with a pending children request.
    pub fn loading_ids(&self) -> HashSet<TermId> {
        lock(&self.in_flight).keys().cloned().collect()
    }

    /// Run `f` against a read-only view of the store.
    pub fn read_store<R>(&self, f: impl FnOnce(&TreeStore) -> R) -> R {
        f(&*read(&self.store))
    }

    /// Make sure the children of `id` are known, fetching them if needed.
    ///
    /// A node whose children are already known returns immediately. On failure
    /// the node's children stay unknown so the next call fetches again.
    /// The fetch runs on a spawned task, so this must be called from within
    /// a tokio runtime.
    #[instrument(skip(self, id), fields(term = %id))]
    pub async fn ensure_children_loaded(&self, id: &TermId) -> Result<LoadOutcome> {
        let pending = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(id).cloned() {
                Some(pending) => {
                    debug!("Joining in-flight children request");
                    pending
                }
                None => {
                    {
                        let store = read(&self.store);
                        let node = store
                            .get(id)
                            .ok_or_else(|| PhenoscopeError::UnknownTerm(id.to_string()))?;
                        if node.children.is_known() {
                            return Ok(LoadOutcome::AlreadyLoaded);
                        }
                    }
                    let pending = self.load(id.clone());
                    in_flight.insert(id.clone(), pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    /// Must be called with the `in_flight` lock held so the task cannot
    /// clear its entry before it is inserted.
    fn load(&self, id: TermId) -> PendingLoad {
        let source = Arc::clone(&self.source);
        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);
        let task_id = id.clone();

        let handle = tokio::spawn(async move {
            let id = task_id;
            debug!(term = %id, "Fetching children");
            let outcome = match source.children(&id).await {
                Ok(records) => {
                    let kids = records
                        .iter()
                        .map(|r| NewNode { id: r.id.clone(), label: source.label(r) })
                        .collect();
                    let merged = write(&store).merge_children(&id, kids);
                    match merged {
                        Ok(Some(report)) => {
                            info!(
                                term = %id,
                                attached = report.attached,
                                rejected = report.rejected.len(),
                                "Merged children"
                            );
                            Ok(LoadOutcome::Loaded(report))
                        }
                        Ok(None) => Ok(LoadOutcome::AlreadyLoaded),
                        Err(e) => Err(e),
                    }
                }
                Err(e) => {
                    warn!(term = %id, error = %e, "Children fetch failed");
                    Err(e)
                }
            };
            lock(&in_flight).remove(&id);
            outcome
        });

        let in_flight = Arc::clone(&self.in_flight);
        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(term = %id, error = %e, "Children load task aborted");
                    lock(&in_flight).remove(&id);
                    Err(PhenoscopeError::fetch_failed(id.as_str(), format!("load task failed: {}", e)))
                }
            }
        }
        .boxed()
        .shared()
    }
}
