//! Identifier-keyed storage for the partially materialized ontology tree.
//!
//! Nodes are only ever added. A node's children move from `Unknown` to
//! `Empty` or `Populated` exactly once and never go back.

use std::collections::HashMap;

use phenoscope_common::{PhenoscopeError, Result, TermId};
use serde::Serialize;
use tracing::warn;

/// What is known about a node's children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "ids", rename_all = "snake_case")]
pub enum Children {
    /// Not fetched yet.
    Unknown,
    /// Fetched; the node has no children in this tree.
    Empty,
    /// Fetched; child ids in source order.
    Populated(Vec<TermId>),
}

impl Children {
    pub fn is_known(&self) -> bool {
        !matches!(self, Children::Unknown)
    }

    pub fn ids(&self) -> &[TermId] {
        match self {
            Children::Populated(ids) => ids,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: TermId,
    pub label: String,
    /// `None` only for the root.
    pub parent: Option<TermId>,
    pub children: Children,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.children, Children::Empty)
    }
}

/// A child as delivered by a source, before it is attached.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub id: TermId,
    pub label: String,
}

/// Result of merging one children response into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Children attached under the requesting node.
    pub attached: usize,
    /// Children refused because the id already lives elsewhere in the tree.
    pub rejected: Vec<TermId>,
}

#[derive(Debug, Clone)]
pub struct TreeStore {
    root: TermId,
    nodes: HashMap<TermId, TreeNode>,
}

impl TreeStore {
    pub fn new(root_id: TermId, root_label: impl Into<String>) -> Self {
        let root = TreeNode {
            id: root_id.clone(),
            label: root_label.into(),
            parent: None,
            children: Children::Unknown,
        };
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), root);
        Self { root: root_id, nodes }
    }

    pub fn root_id(&self) -> &TermId {
        &self.root
    }

    pub fn get(&self, id: &TermId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &TermId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent_of(&self, id: &TermId) -> Option<&TermId> {
        self.nodes.get(id).and_then(|n| n.parent.as_ref())
    }

    /// Child nodes of `id` in source order. Empty when unknown or a leaf.
    pub fn children_of(&self, id: &TermId) -> Vec<&TreeNode> {
        self.nodes
            .get(id)
            .map(|n| n.children.ids().iter().filter_map(|c| self.nodes.get(c)).collect())
            .unwrap_or_default()
    }

    /// Attach a fetched child list under `parent`.
    ///
    /// Returns `Ok(None)` when the parent's children were already known;
    /// the existing list is left as is. A child id already present anywhere
    /// in the tree (or repeated within `kids`) is not attached a second time
    /// and is listed in [`MergeReport::rejected`].
    pub(crate) fn merge_children(
        &mut self,
        parent: &TermId,
        kids: Vec<NewNode>,
    ) -> Result<Option<MergeReport>> {
        let known = self
            .nodes
            .get(parent)
            .ok_or_else(|| PhenoscopeError::UnknownTerm(parent.to_string()))?
            .children
            .is_known();
        if known {
            return Ok(None);
        }

        let mut report = MergeReport::default();
        let mut ids = Vec::with_capacity(kids.len());

        for kid in kids {
            if let Some(existing) = self.nodes.get(&kid.id) {
                warn!(
                    child = %kid.id,
                    requested_parent = %parent,
                    existing_parent = ?existing.parent,
                    "Term already in tree under another parent; not attaching again"
                );
                report.rejected.push(kid.id);
                continue;
            }
            self.nodes.insert(
                kid.id.clone(),
                TreeNode {
                    id: kid.id.clone(),
                    label: kid.label,
                    parent: Some(parent.clone()),
                    children: Children::Unknown,
                },
            );
            ids.push(kid.id);
        }

        report.attached = ids.len();
        let children = if ids.is_empty() {
            Children::Empty
        } else {
            Children::Populated(ids)
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children = children;
        }
        Ok(Some(report))
    }
}
