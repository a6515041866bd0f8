//! Configuration loading for Phenoscope.
//! Reads phenoscope.toml from the current directory or path in PHENOSCOPE_CONFIG env var.
//! Every key has a default, so an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "PHENOSCOPE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "phenoscope.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyConfig {
    #[serde(default = "default_ontology_url")]
    pub base_url: String,
    /// Result cap for phenotype search (type-ahead and submit).
    #[serde(default = "default_search_limit")]
    pub search_limit: i64,
    /// Result cap for gene type-ahead search.
    #[serde(default = "default_gene_search_limit")]
    pub gene_search_limit: i64,
    /// Result cap for an explicit gene search; negative means unlimited.
    #[serde(default = "default_gene_submit_limit")]
    pub gene_submit_limit: i64,
    #[serde(default = "default_root_id")]
    pub root_id: String,
    #[serde(default = "default_root_label")]
    pub root_label: String,
}

fn default_ontology_url()      -> String { "https://ontology.jax.org/api".to_string() }
fn default_search_limit()      -> i64    { 50 }
fn default_gene_search_limit() -> i64    { 100 }
fn default_gene_submit_limit() -> i64    { -1 }
fn default_root_id()           -> String { "HP:0000001".to_string() }
fn default_root_label()        -> String { "ALL".to_string() }

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            base_url: default_ontology_url(),
            search_limit: default_search_limit(),
            gene_search_limit: default_gene_search_limit(),
            gene_submit_limit: default_gene_submit_limit(),
            root_id: default_root_id(),
            root_label: default_root_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_url")]
    pub base_url: String,
}

fn default_stats_url() -> String { "http://127.0.0.1:8000".to_string() }

impl Default for StatsConfig {
    fn default() -> Self {
        Self { base_url: default_stats_url() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a type-ahead query is sent. Submitted queries skip it.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 { 250 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_allowed_domains: Vec<String>,
}

fn default_timeout_secs() -> u64 { 30 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            extra_allowed_domains: vec![],
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}


impl Config {
    /// Load configuration from phenoscope.toml.
    /// Checks PHENOSCOPE_CONFIG env var first, then current directory.
    /// A missing file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        if !Path::new(&path).exists() {
            tracing::info!("No config file at {}, using defaults", path);
            return Ok(Self::default());
        }

        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.search.debounce_ms > 10_000 {
            anyhow::bail!(
                "search.debounce_ms = {} is unreasonably large (max 10000)",
                config.search.debounce_ms
            );
        }
        Ok(config)
    }
}
