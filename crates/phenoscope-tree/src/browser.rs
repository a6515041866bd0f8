//! Ontology browser: the tree, the search box and the expansion state behind
//! one widget.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use phenoscope_common::{PhenoscopeError, Result, TermId};
use phenoscope_config::Config;
use phenoscope_sources::TermSource;
use tracing::debug;

use crate::lock;
use crate::materializer::{LoadOutcome, TreeMaterializer};
use crate::search::{SearchController, SearchOutcome, ViewMode};
use crate::store::TreeStore;
use crate::view::{DisplayModel, ResultRow, TreeRow};

type SelectionCallback = Box<dyn Fn(&TermId) + Send + Sync>;

pub struct OntologyBrowser {
    tree: TreeMaterializer,
    search: SearchController,
    expanded: Mutex<HashSet<TermId>>,
    on_selected: Option<SelectionCallback>,
}

impl OntologyBrowser {
    pub fn new(source: Arc<dyn TermSource>, debounce: Duration) -> Self {
        Self {
            tree: TreeMaterializer::new(Arc::clone(&source)),
            search: SearchController::new(source, debounce),
            expanded: Mutex::new(HashSet::new()),
            on_selected: None,
        }
    }

    pub fn from_config(source: Arc<dyn TermSource>, config: &Config) -> Self {
        Self::new(source, config.search.debounce())
    }

    /// Register the callback fired by [`select`](Self::select).
    pub fn on_node_selected(mut self, callback: impl Fn(&TermId) + Send + Sync + 'static) -> Self {
        self.on_selected = Some(Box::new(callback));
        self
    }

    pub fn tree(&self) -> &TreeMaterializer {
        &self.tree
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    /// Expand a node, loading its children on first expansion.
    /// If the load fails, or the returned future is dropped before it
    /// resolves, the node is collapsed again.
    pub async fn expand(&self, id: &TermId) -> Result<LoadOutcome> {
        if self.tree.get_node(id).is_none() {
            return Err(PhenoscopeError::UnknownTerm(id.to_string()));
        }
        let newly_expanded = lock(&self.expanded).insert(id.clone());
        let mut rollback = ExpansionRollback {
            expanded: &self.expanded,
            id,
            armed: newly_expanded,
        };

        let outcome = self.tree.ensure_children_loaded(id).await?;
        rollback.armed = false;
        Ok(outcome)
    }

    /// Collapse a node. Descendants keep their own expansion state.
    pub fn collapse(&self, id: &TermId) -> bool {
        lock(&self.expanded).remove(id)
    }

    pub fn is_expanded(&self, id: &TermId) -> bool {
        lock(&self.expanded).contains(id)
    }

    /// Expanded node ids, sorted.
    pub fn expanded(&self) -> Vec<TermId> {
        let mut ids: Vec<TermId> = lock(&self.expanded).iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Forward a picked node to the registered callback.
    pub fn select(&self, id: &TermId) {
        debug!(term = %id, "Node selected");
        if let Some(callback) = &self.on_selected {
            callback(id);
        }
    }

    pub async fn set_query(&self, text: &str) -> Result<SearchOutcome> {
        self.search.set_query(text).await
    }

    pub async fn commit_query(&self, text: &str) -> Result<SearchOutcome> {
        self.search.commit_query(text).await
    }

    pub fn mode(&self) -> ViewMode {
        self.search.mode()
    }

    /// Everything the rendering layer needs to draw the current view.
    pub fn display_model(&self) -> DisplayModel {
        match self.search.mode() {
            ViewMode::Searching => DisplayModel::Searching {
                query: self.search.query(),
                pending: self.search.is_pending(),
                rows: self
                    .search
                    .results()
                    .into_iter()
                    .map(|hit| ResultRow {
                        spans: self.search.highlight(&hit.label),
                        id: hit.id,
                        label: hit.label,
                        extra: hit.extra,
                    })
                    .collect(),
            },
            ViewMode::Browsing => {
                let expanded = lock(&self.expanded).clone();
                let loading = self.tree.loading_ids();
                let rows = self
                    .tree
                    .read_store(|store| self.tree_rows(store, &expanded, &loading));
                DisplayModel::Browsing { rows }
            }
        }
    }

    fn tree_rows(
        &self,
        store: &TreeStore,
        expanded: &HashSet<TermId>,
        loading: &HashSet<TermId>,
    ) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        let mut stack = vec![(store.root_id().clone(), 0usize)];

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = store.get(&id) else { continue };
            let is_expanded = expanded.contains(&id);

            rows.push(TreeRow {
                id: id.clone(),
                label: node.label.clone(),
                spans: self.search.highlight(&node.label),
                depth,
                expanded: is_expanded,
                is_leaf: node.is_leaf(),
                loading: loading.contains(&id),
                children_known: node.children.is_known(),
            });

            if is_expanded {
                for child in node.children.ids().iter().rev() {
                    stack.push((child.clone(), depth + 1));
                }
            }
        }
        rows
    }
}

/// Removes a node from the expansion set on drop unless disarmed.
struct ExpansionRollback<'a> {
    expanded: &'a Mutex<HashSet<TermId>>,
    id: &'a TermId,
    armed: bool,
}

impl Drop for ExpansionRollback<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(term = %self.id, "Expansion rolled back");
            lock(self.expanded).remove(self.id);
        }
    }
}
