pub mod aggregator;
pub mod service;

pub use aggregator::PermitAggregator;
pub use service::PermitSearchService;

pub use crate::domain::{AdapterResult, Permit, PermitAdapter, PermitQuery, SearchOutcome};
pub use crate::utils::error::Result;
