// Adapters layer: concrete permit sources, the geocoder and the registry
// that assembles them from configuration.

pub mod geocoder;
pub mod manual;
pub mod socrata;

pub use geocoder::NominatimGeocoder;
pub use manual::ManualPortalAdapter;
pub use socrata::SocrataPermitAdapter;

use crate::config::{HttpConfig, JurisdictionConfig, ServiceConfig};
use crate::domain::{Geocoder, PermitAdapter};
use crate::utils::error::Result;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Shared outbound client: one connection pool, user agent and timeout.
pub fn build_http_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Adapters in declared priority order.
pub fn build_adapters(config: &ServiceConfig, client: &Client) -> Vec<Arc<dyn PermitAdapter>> {
    config
        .jurisdictions
        .iter()
        .map(|jurisdiction| -> Arc<dyn PermitAdapter> {
            match jurisdiction {
                JurisdictionConfig::Socrata(c) => {
                    Arc::new(SocrataPermitAdapter::new(c, client.clone()))
                }
                JurisdictionConfig::Manual(c) => Arc::new(ManualPortalAdapter::new(c)),
            }
        })
        .collect()
}

pub fn build_geocoder(config: &ServiceConfig, client: &Client) -> Option<Arc<dyn Geocoder>> {
    if !config.geocoder.enabled {
        return None;
    }
    Some(Arc::new(NominatimGeocoder::new(
        config.geocoder.endpoint.clone(),
        client.clone(),
    )))
}
