//! Cell statistics API client.
//!
//! Read-only access to the local statistics service that reports which cell
//! types are enriched for a phenotype or gene. Documents are passed through
//! as JSON; the tree core never interprets them.

use phenoscope_common::{PhenoscopeError, Result, SandboxClient};
use phenoscope_config::Config;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

/// Single-cell atlases the statistics service indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    DescartesHuman,
    HumanCellLandscape,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::DescartesHuman     => "DescartesHuman",
            Dataset::HumanCellLandscape => "HumanCellLandscape",
        }
    }

    pub fn all() -> [Dataset; 2] {
        [Dataset::DescartesHuman, Dataset::HumanCellLandscape]
    }
}

/// Pseudo cell type meaning "every cell type" for [`CellStatsClient::cells_below_q`].
pub const ALL_CELL_TYPES: &str = "All";

pub struct CellStatsClient {
    client: SandboxClient,
    base_url: Url,
}

impl CellStatsClient {
    pub fn new(client: SandboxClient, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PhenoscopeError::Config(format!("Invalid stats base URL {}: {}", base_url, e)))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(client: SandboxClient, config: &Config) -> Result<Self> {
        Self::new(client, &config.stats.base_url)
    }

    /// Cell enrichment rows for a phenotype, across both atlases.
    #[instrument(skip(self))]
    pub async fn cells_by_phenotype(&self, hpo_id: &str) -> Result<Vec<Value>> {
        let url = self.endpoint(&["api", "cellByHpoid"]);
        self.fetch_documents(url, &[("hpo_id", hpo_id)]).await
    }

    /// Cell enrichment rows for a phenotype in a single atlas.
    #[instrument(skip(self))]
    pub async fn cells_by_phenotype_in(&self, hpo_id: &str, dataset: Dataset) -> Result<Vec<Value>> {
        let url = self.endpoint(&["api", "cellByHpoid1"]);
        self.fetch_documents(url, &[("hpo_id", hpo_id), ("db_type", dataset.as_str())])
            .await
    }

    /// Cell types whose name matches `name` (case-insensitive, server side).
    #[instrument(skip(self))]
    pub async fn cell_types(&self, name: &str, dataset: Dataset) -> Result<Vec<Value>> {
        let url = self.endpoint(&["api", "cell", "type"]);
        self.fetch_documents(url, &[("celltype_name", name), ("db_type", dataset.as_str())])
            .await
    }

    /// Enrichment rows for a cell type with q-value below `q`.
    /// Pass [`ALL_CELL_TYPES`] to query every cell type.
    #[instrument(skip(self))]
    pub async fn cells_below_q(&self, celltype: &str, q: f64, dataset: Dataset) -> Result<Vec<Value>> {
        let url = self.endpoint(&["api", "cell"]);
        let q = q.to_string();
        self.fetch_documents(
            url,
            &[("celltype_name", celltype), ("q", q.as_str()), ("db_type", dataset.as_str())],
        )
        .await
    }

    /// Severity and definition records for a phenotype.
    #[instrument(skip(self))]
    pub async fn phenotype_definition(&self, hpo_id: &str) -> Result<Vec<Value>> {
        // The service decodes `%` back to `:` in this path segment.
        let encoded = encode_term_segment(hpo_id);
        let url = self.endpoint(&["api", "hpo-definitionNew", &encoded]);
        self.fetch_documents(url, &[]).await
    }

    /// Cell enrichment rows for a gene in a single atlas.
    #[instrument(skip(self))]
    pub async fn gene_cells(&self, gene: &str, dataset: Dataset) -> Result<Vec<Value>> {
        let encoded = encode_term_segment(gene);
        let url = self.endpoint(&["gene", &encoded, dataset.as_str()]);
        self.fetch_documents(url, &[]).await
    }

    /// Gene enrichment rows for one cell type in one atlas. This is the
    /// lookup behind a row of the cell type table.
    #[instrument(skip(self))]
    pub async fn genes_for_cell_type(&self, celltype: &str, dataset: Dataset) -> Result<Vec<Value>> {
        let encoded = encode_term_segment(celltype);
        let url = self.endpoint(&["gene1", &encoded, dataset.as_str()]);
        self.fetch_documents(url, &[]).await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch_documents(&self, url: Url, params: &[(&str, &str)]) -> Result<Vec<Value>> {
        let target = url.to_string();
        let resp = self.client.get(url.as_str())?.query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PhenoscopeError::fetch_failed(target, format!("HTTP {}", status)));
        }

        let body = resp.text().await?;
        let docs = parse_documents(&target, &body)?;
        debug!(count = docs.len(), "Stats documents returned");
        Ok(docs)
    }
}

pub(crate) fn encode_term_segment(id: &str) -> String {
    id.replace(':', "%")
}

/// Empty bodies and `null` both mean "no rows".
pub(crate) fn parse_documents(target: &str, body: &str) -> Result<Vec<Value>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let docs: Option<Vec<Value>> =
        serde_json::from_str(body).map_err(|e| PhenoscopeError::malformed(target, e))?;
    Ok(docs.unwrap_or_default())
}
