use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::FetchError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A capability-capped HTTP client that only allows requests to approved
/// authority domains. Every outbound fetch in the pipeline goes through
/// this client; a URL outside the allowlist is a permanent fetch failure.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist of regulator domains.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Same as [`SandboxClient::new`] with an explicit per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let mut allowlist = HashSet::new();
        let domains = vec![
            "api.fda.gov",              // openFDA device endpoints
            "www.accessdata.fda.gov",   // FDA document pages
            "www.fda.gov",              // FDA safety communications
            "www.gov.uk",               // MHRA alerts
            "assets.publishing.service.gov.uk", // GOV.UK attachments
            "recalls-rappels.canada.ca", // Health Canada recall feed
            "www.canada.ca",            // Health Canada document pages
            "localhost",                // test fixtures
            "127.0.0.1",
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent("vigil/0.1 (regulatory monitoring)")
            .build()
            .map_err(|e| FetchError::Permanent(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Builds a GET request after checking the URL against the allowlist.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, FetchError> {
        if !self.is_allowed(url) {
            return Err(FetchError::Permanent(format!(
                "network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}
