use crate::domain::{Geocoder, ResolvedLocation};
use crate::utils::error::{PermitError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// OpenStreetMap Nominatim lookup (no API key).
pub struct NominatimGeocoder {
    endpoint: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    hamlet: Option<String>,
    county: Option<String>,
}

impl NominatimAddress {
    fn into_location(self) -> ResolvedLocation {
        // city/town/village 優先，county 通常是 "<Name> County"
        let city = self
            .city
            .or(self.town)
            .or(self.village)
            .or(self.municipality)
            .or(self.hamlet);
        ResolvedLocation {
            city,
            county: self.county,
        }
    }
}

impl NominatimGeocoder {
    pub fn new(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, address: &str) -> Result<ResolvedLocation> {
        tracing::debug!("Geocoding '{}' via {}", address, self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", address),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PermitError::UpstreamStatus {
                adapter: "geocoder".to_string(),
                status: response.status().as_u16(),
            });
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        Ok(places
            .into_iter()
            .next()
            .map(|place| place.address.into_location())
            .unwrap_or_default())
    }
}
