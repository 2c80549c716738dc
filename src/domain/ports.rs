use crate::domain::model::{AdapterResult, PermitQuery, ResolvedLocation};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Permit source for one jurisdiction.
///
/// Errors returned from [`PermitAdapter::search`] never reach the caller of
/// the aggregator; they are logged and treated as [`AdapterResult::Empty`].
#[async_trait]
pub trait PermitAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn portal(&self) -> &str;

    /// County name fragment that moves this adapter right after the primary one.
    fn promote_for_county(&self) -> Option<&str> {
        None
    }

    /// Whether `search` performs outbound I/O.
    fn requires_network(&self) -> bool {
        true
    }

    async fn search(&self, query: &PermitQuery) -> Result<AdapterResult>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<ResolvedLocation>;
}
