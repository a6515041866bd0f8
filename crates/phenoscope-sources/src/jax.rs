//! JAX ontology API clients.
//!
//! Endpoints (relative to the configured base, default https://ontology.jax.org/api):
//! - `hp/terms/{id}/children` → `[ {id, name, ...}, ... ]`
//! - `hp/search?q=&limit=`   → `{ "terms": [ {id, name, ...}, ... ] }`
//! - `network/search/gene?q=&limit=` → `{ "results": [ {id, name, ...stats}, ... ] }`

use async_trait::async_trait;
use phenoscope_common::{PhenoscopeError, Result, SandboxClient, TermId, TermRecord};
use phenoscope_config::Config;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{SearchLimit, SearchLimits, TermSource};

/// Root of the human phenotype ontology ("All").
pub const HPO_ROOT_ID: &str = "HP:0000001";

/// Synthetic root of the flat gene catalogue.
pub const GENE_ROOT_ID: &str = "gene-list";
pub const GENE_ROOT_LABEL: &str = "Gene List";

/// Shared transport for both JAX sources.
#[derive(Debug, Clone)]
struct JaxApi {
    client: SandboxClient,
    base_url: String,
}

impl JaxApi {
    fn new(client: SandboxClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self.client.get(&url)?.query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PhenoscopeError::fetch_failed(url, format!("HTTP {}", status)));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| PhenoscopeError::malformed(url, e))
    }
}

/// Decode a JSON array of `{id, name}` objects.
pub(crate) fn parse_records(target: &str, value: Value) -> Result<Vec<TermRecord>> {
    if !value.is_array() {
        return Err(PhenoscopeError::malformed(target, "expected a JSON array"));
    }
    serde_json::from_value(value).map_err(|e| PhenoscopeError::malformed(target, e))
}

/// Decode `{ <field>: [ ... ] }` into records.
pub(crate) fn parse_wrapped(target: &str, mut value: Value, field: &str) -> Result<Vec<TermRecord>> {
    let Some(inner) = value.get_mut(field).map(Value::take) else {
        return Err(PhenoscopeError::malformed(target, format!("missing `{}` field", field)));
    };
    parse_records(target, inner)
}

// ---------------------------------------------------------------------------
// HPO phenotype terms
// ---------------------------------------------------------------------------

/// Human Phenotype Ontology source: lazily browsable tree plus search.
#[derive(Debug, Clone)]
pub struct HpoSource {
    api: JaxApi,
    root: TermRecord,
    limit: SearchLimit,
}

impl HpoSource {
    pub fn new(client: SandboxClient, base_url: &str) -> Self {
        Self {
            api: JaxApi::new(client, base_url),
            root: TermRecord::new(HPO_ROOT_ID, "ALL"),
            limit: SearchLimit::Limited(50),
        }
    }

    pub fn from_config(client: SandboxClient, config: &Config) -> Self {
        Self {
            api: JaxApi::new(client, &config.ontology.base_url),
            root: TermRecord::new(
                config.ontology.root_id.as_str(),
                config.ontology.root_label.as_str(),
            ),
            limit: SearchLimit::from_raw(config.ontology.search_limit),
        }
    }
}

#[async_trait]
impl TermSource for HpoSource {
    fn root(&self) -> TermRecord {
        self.root.clone()
    }

    #[instrument(skip(self))]
    async fn children(&self, id: &TermId) -> Result<Vec<TermRecord>> {
        let path = format!("hp/terms/{}/children", id);
        let value = self.api.get_json(&path, &[]).await?;
        let records = parse_records(id.as_str(), value)?;
        debug!(count = records.len(), "HPO children returned");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: SearchLimit) -> Result<Vec<TermRecord>> {
        let limit = limit.as_param();
        let value = self
            .api
            .get_json("hp/search", &[("q", query), ("limit", limit.as_str())])
            .await?;
        let records = parse_wrapped(query, value, "terms")?;
        debug!(count = records.len(), "HPO search returned results");
        Ok(records)
    }

    fn search_limits(&self) -> SearchLimits {
        SearchLimits::uniform(self.limit)
    }
}

// ---------------------------------------------------------------------------
// Genes
// ---------------------------------------------------------------------------

/// Gene catalogue source. Genes have no hierarchy: the root is a leaf and
/// genes are only reachable through search.
#[derive(Debug, Clone)]
pub struct GeneSource {
    api: JaxApi,
    limits: SearchLimits,
}

impl GeneSource {
    pub fn new(client: SandboxClient, base_url: &str) -> Self {
        Self {
            api: JaxApi::new(client, base_url),
            limits: SearchLimits {
                typeahead: SearchLimit::Limited(100),
                submit: SearchLimit::Unlimited,
            },
        }
    }

    pub fn from_config(client: SandboxClient, config: &Config) -> Self {
        Self {
            api: JaxApi::new(client, &config.ontology.base_url),
            limits: SearchLimits {
                typeahead: SearchLimit::from_raw(config.ontology.gene_search_limit),
                submit: SearchLimit::from_raw(config.ontology.gene_submit_limit),
            },
        }
    }
}

#[async_trait]
impl TermSource for GeneSource {
    fn root(&self) -> TermRecord {
        TermRecord::new(GENE_ROOT_ID, GENE_ROOT_LABEL)
    }

    async fn children(&self, _id: &TermId) -> Result<Vec<TermRecord>> {
        Ok(Vec::new())
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: SearchLimit) -> Result<Vec<TermRecord>> {
        let limit = limit.as_param();
        let value = self
            .api
            .get_json("network/search/gene", &[("q", query), ("limit", limit.as_str())])
            .await?;
        let records = parse_wrapped(query, value, "results")?;
        debug!(count = records.len(), "Gene search returned results");
        Ok(records)
    }

    fn label(&self, record: &TermRecord) -> String {
        format!("{} - {}", record.id, record.name)
    }

    fn search_limits(&self) -> SearchLimits {
        self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_children_preserves_order() {
        let body = json!([
            {"id": "HP:0000118", "name": "Phenotypic abnormality"},
            {"id": "HP:0000005", "name": "Mode of inheritance"},
        ]);
        let recs = parse_records("HP:0000001", body).unwrap();
        let ids: Vec<&str> = recs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["HP:0000118", "HP:0000005"]);
    }

    #[test]
    fn test_parse_children_empty() {
        assert!(parse_records("HP:0000118", json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_children_not_array_is_malformed() {
        let err = parse_records("HP:0000118", json!({"terms": []})).unwrap_err();
        assert!(matches!(err, PhenoscopeError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_record_missing_name_is_malformed() {
        let err = parse_records("HP:0000118", json!([{"id": "HP:1"}])).unwrap_err();
        assert!(matches!(err, PhenoscopeError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_hpo_search() {
        let body = json!({"terms": [{"id": "HP:0000002", "name": "Abnormality of body height"}], "totalCount": 1});
        let recs = parse_wrapped("abn", body, "terms").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "Abnormality of body height");
    }

    #[test]
    fn test_parse_gene_search_missing_field() {
        let err = parse_wrapped("KRAS", json!({"terms": []}), "results").unwrap_err();
        assert!(err.to_string().contains("results"));
    }

    #[test]
    fn test_gene_label_and_root() {
        let source = GeneSource::new(SandboxClient::new().unwrap(), "https://ontology.jax.org/api/");
        let rec = TermRecord::new("NCBIGene:3845", "KRAS");
        assert_eq!(source.label(&rec), "NCBIGene:3845 - KRAS");
        assert_eq!(source.root().name, GENE_ROOT_LABEL);
        assert_eq!(source.search_limits().submit, SearchLimit::Unlimited);
    }

    #[test]
    fn test_hpo_from_config() {
        let mut config = Config::default();
        config.ontology.search_limit = 25;
        let source = HpoSource::from_config(SandboxClient::new().unwrap(), &config);
        assert_eq!(source.root().id.as_str(), HPO_ROOT_ID);
        assert_eq!(source.root().name, "ALL");
        assert_eq!(source.search_limits().typeahead, SearchLimit::Limited(25));
    }

    #[tokio::test]
    async fn test_gene_children_always_empty() {
        let source = GeneSource::new(SandboxClient::new().unwrap(), "https://ontology.jax.org/api");
        let kids = source.children(&TermId::from(GENE_ROOT_ID)).await.unwrap();
        assert!(kids.is_empty());
    }
}
