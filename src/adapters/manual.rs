use crate::config::ManualPortalConfig;
use crate::domain::{AdapterResult, PermitAdapter, PermitQuery};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Jurisdiction without a usable public API (Tyler CSS, MyGovernmentOnline,
/// GovWell, county pages). Always answers with a link a person can follow.
pub struct ManualPortalAdapter {
    name: String,
    portal: String,
    search_url_template: String,
    promote_for_county: Option<String>,
}

impl ManualPortalAdapter {
    pub fn new(config: &ManualPortalConfig) -> Self {
        Self {
            name: config.name.clone(),
            portal: config.portal.clone(),
            search_url_template: config.search_url_template.clone(),
            promote_for_county: config.promote_for_county.clone(),
        }
    }

    pub fn manual_check_url(&self, query: &PermitQuery) -> String {
        let term = query
            .address
            .as_deref()
            .or(query.parcel_id.as_deref())
            .unwrap_or_default();
        let encoded: String = url::form_urlencoded::byte_serialize(term.as_bytes()).collect();
        self.search_url_template.replace("{q}", &encoded)
    }
}

#[async_trait]
impl PermitAdapter for ManualPortalAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn portal(&self) -> &str {
        &self.portal
    }

    fn promote_for_county(&self) -> Option<&str> {
        self.promote_for_county.as_deref()
    }

    fn requires_network(&self) -> bool {
        false
    }

    async fn search(&self, query: &PermitQuery) -> Result<AdapterResult> {
        Ok(AdapterResult::ManualCheck {
            url: self.manual_check_url(query),
        })
    }
}
