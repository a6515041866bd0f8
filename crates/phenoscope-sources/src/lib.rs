//! phenoscope-sources — Remote term sources and the cell statistics client.
//! - HPO phenotype terms (children + search) from the JAX ontology API
//! - Gene network search from the same API
//! - Read-only client for the local cell statistics API

pub mod jax;
pub mod stats;

use async_trait::async_trait;
use phenoscope_common::{Result, TermId, TermRecord};

pub use jax::{GeneSource, HpoSource};
pub use stats::{CellStatsClient, Dataset};

/// Result cap sent with a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Limited(u32),
    Unlimited,
}

impl SearchLimit {
    /// Maps the API's raw form: any negative number means unlimited.
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::Unlimited
        } else {
            Self::Limited(u32::try_from(raw).unwrap_or(u32::MAX))
        }
    }

    /// Value for the `limit` query parameter.
    pub fn as_param(&self) -> String {
        match self {
            Self::Limited(n) => n.to_string(),
            Self::Unlimited => "-1".to_string(),
        }
    }
}

/// Limits for the two search entry points: type-ahead and explicit submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub typeahead: SearchLimit,
    pub submit: SearchLimit,
}

impl SearchLimits {
    pub fn uniform(limit: SearchLimit) -> Self {
        Self { typeahead: limit, submit: limit }
    }
}

/// Common interface for every remote term source.
#[async_trait]
pub trait TermSource: Send + Sync {
    /// Synthetic root the browse tree starts from.
    fn root(&self) -> TermRecord;

    /// Direct children of a term, in the order the source returns them.
    async fn children(&self, id: &TermId) -> Result<Vec<TermRecord>>;

    /// Terms matching a free-text query.
    async fn search(&self, query: &str, limit: SearchLimit) -> Result<Vec<TermRecord>>;

    /// Display label for a record. Sources with composite labels override this.
    fn label(&self, record: &TermRecord) -> String {
        record.name.clone()
    }

    /// Default limits for the type-ahead and submit paths.
    fn search_limits(&self) -> SearchLimits {
        SearchLimits::uniform(SearchLimit::Limited(50))
    }
}
