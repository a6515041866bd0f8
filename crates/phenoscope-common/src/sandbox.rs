use phenoscope_config::HttpConfig;
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::PhenoscopeError;

/// Hosts every Phenoscope client may reach without extra configuration.
const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "ontology.jax.org", // HPO terms and gene network search
    "localhost",        // Local cell statistics API
    "127.0.0.1",        // Localhost alt
];

/// An HTTP client that only issues requests to approved domains.
///
/// Every remote call in the workspace goes through this type so a typo in a
/// configured base URL fails fast instead of reaching an arbitrary host.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and a 30 second timeout.
    pub fn new() -> Result<Self, PhenoscopeError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, PhenoscopeError> {
        let allowlist = DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| PhenoscopeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Applies the `[http]` section: request timeout plus extra allowed hosts.
    pub fn from_http_config(config: &HttpConfig) -> Result<Self, PhenoscopeError> {
        let mut client = Self::with_timeout(config.timeout())?;
        for domain in &config.extra_allowed_domains {
            client.allow_domain(domain);
        }
        Ok(client)
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        // Exact match, or a subdomain of an allowed domain
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    /// Returns a GET request builder for an allowed URL.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, PhenoscopeError> {
        if !self.is_allowed(url) {
            tracing::warn!(url, "Blocked request to host outside allowlist");
            return Err(PhenoscopeError::Security(format!(
                "Domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}
