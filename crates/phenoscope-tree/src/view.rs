//! Display model handed to the rendering layer.

use phenoscope_common::TermId;
use serde::Serialize;

use crate::highlight::Span;
use crate::search::ViewMode;

/// A visible row of the browse tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeRow {
    pub id: TermId,
    pub label: String,
    pub spans: Vec<Span>,
    /// 0 for the root.
    pub depth: usize,
    pub expanded: bool,
    pub is_leaf: bool,
    /// A children request for this node is pending.
    pub loading: bool,
    pub children_known: bool,
}

/// A row of the flat search result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub id: TermId,
    pub label: String,
    pub spans: Vec<Span>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DisplayModel {
    /// Depth-first rows of the tree; only expanded nodes show their children.
    Browsing { rows: Vec<TreeRow> },
    /// Results of the last completed search. `pending` is set while the
    /// search for `query` itself has not come back yet.
    Searching { query: String, pending: bool, rows: Vec<ResultRow> },
}

impl DisplayModel {
    pub fn mode(&self) -> ViewMode {
        match self {
            DisplayModel::Browsing { .. } => ViewMode::Browsing,
            DisplayModel::Searching { .. } => ViewMode::Searching,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DisplayModel::Browsing { rows } => rows.len(),
            DisplayModel::Searching { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
