//! phenoscope-tree — Lazily materialized ontology tree with search.
//! - Tree store keyed by term id, append-only
//! - Tree materializer: on-demand children loading with request coalescing
//! - Search controller: debounced and immediate queries, last request wins
//! - Highlighting and the display model consumed by the UI layer

pub mod browser;
pub mod highlight;
pub mod materializer;
pub mod search;
pub mod store;
pub mod view;

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use browser::OntologyBrowser;
pub use highlight::{highlight, Span};
pub use materializer::{LoadOutcome, TreeMaterializer};
pub use search::{SearchController, SearchHit, SearchOutcome, ViewMode};
pub use store::{Children, MergeReport, TreeNode, TreeStore};
pub use view::{DisplayModel, ResultRow, TreeRow};

// No code path panics while holding these locks, so a poisoned lock still
// holds consistent data.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
