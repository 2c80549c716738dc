pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::ServiceConfig;
pub use core::{PermitAggregator, PermitSearchService};
pub use domain::{AdapterResult, Permit, PermitAdapter, PermitQuery, SearchParams, SearchResponse};
pub use utils::error::{PermitError, Result};
