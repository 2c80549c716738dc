use crate::adapters;
use crate::config::ServiceConfig;
use crate::core::aggregator::PermitAggregator;
use crate::domain::{Geocoder, PermitQuery, SearchParams, SearchResponse};
use crate::utils::error::Result;
use std::sync::Arc;

/// Query validation, optional geocoding, then the adapter cascade.
pub struct PermitSearchService {
    aggregator: PermitAggregator,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl PermitSearchService {
    pub fn new(aggregator: PermitAggregator, geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self {
            aggregator,
            geocoder,
        }
    }

    /// Wires the configured adapters and geocoder around one shared HTTP client.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let client = adapters::build_http_client(&config.http)?;
        let adapter_list = adapters::build_adapters(config, &client);
        tracing::info!("📋 {} jurisdictions registered", adapter_list.len());

        let aggregator = PermitAggregator::new(adapter_list, config.request_timeout())
            .with_adapter_delay(config.adapter_delay());

        Ok(Self::new(aggregator, adapters::build_geocoder(config, &client)))
    }

    pub fn adapter_count(&self) -> usize {
        self.aggregator.adapter_count()
    }

    /// Rejects malformed input before any adapter runs. "No permits" is an
    /// `Ok` response with an empty list.
    pub async fn search(&self, params: SearchParams) -> Result<SearchResponse> {
        let mut query = PermitQuery::parse(params)?;

        if let (Some(geocoder), Some(address)) = (&self.geocoder, query.address.clone()) {
            match geocoder.resolve(&address).await {
                Ok(location) => {
                    tracing::debug!(
                        "Resolved '{}' to city={:?} county={:?}",
                        address,
                        location.city,
                        location.county
                    );
                    query.location = location;
                }
                Err(e) => tracing::warn!("⚠️ Geocoding failed, using declared order: {}", e),
            }
        }

        let outcome = self.aggregator.find_permits(&query).await;
        Ok(SearchResponse::new(&query, outcome))
    }
}
