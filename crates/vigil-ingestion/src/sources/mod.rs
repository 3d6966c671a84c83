//! Authority source adapters.

pub mod healthcanada;
pub mod mhra;
pub mod openfda;

use std::sync::Arc;

use async_trait::async_trait;

use vigil_common::error::FetchError;
use vigil_common::sandbox::SandboxClient;
use vigil_common::VigilError;
use vigil_db::schema::Authority;

use crate::models::{FetchBatch, FetchConfig};

/// Common interface over one authority's public listing.
#[async_trait]
pub trait SourceAdapter: Send + Sync + std::fmt::Debug {
    /// Short name used for CLI selection and run reports.
    fn name(&self) -> &'static str;

    /// The authority this adapter speaks for.
    fn authority(&self) -> Authority;

    /// Fetch the authority's current listing, newest first. A malformed
    /// individual entry is skipped and counted, never a batch failure.
    async fn fetch(&self, cfg: &FetchConfig) -> Result<FetchBatch, FetchError>;
}

/// Every adapter known to the pipeline.
pub fn all_adapters(client: &SandboxClient) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(openfda::OpenFdaAdapter::new(client.clone())),
        Arc::new(mhra::MhraAdapter::new(client.clone())),
        Arc::new(healthcanada::HealthCanadaAdapter::new(client.clone())),
    ]
}

/// Subset selection by adapter name; an empty list selects all.
pub fn select_adapters(
    client: &SandboxClient,
    names: &[String],
) -> vigil_common::Result<Vec<Arc<dyn SourceAdapter>>> {
    let all = all_adapters(client);
    if names.is_empty() {
        return Ok(all);
    }
    names
        .iter()
        .map(|name| {
            all.iter()
                .find(|a| a.name() == name)
                .cloned()
                .ok_or_else(|| VigilError::Config(format!("unknown adapter: {name}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_by_default() {
        let client = SandboxClient::new().unwrap();
        assert_eq!(select_adapters(&client, &[]).unwrap().len(), 3);
    }

    #[test]
    fn test_select_by_name() {
        let client = SandboxClient::new().unwrap();
        let picked = select_adapters(&client, &["mhra".to_string()]).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name(), "mhra");
    }

    #[test]
    fn test_unknown_name_is_config_error() {
        let client = SandboxClient::new().unwrap();
        let err = select_adapters(&client, &["tga".to_string()]).unwrap_err();
        assert!(matches!(err, VigilError::Config(_)));
    }
}
