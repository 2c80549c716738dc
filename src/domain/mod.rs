// Domain layer: permit models, query parsing and the adapter/geocoder ports.

pub mod model;
pub mod ports;
pub mod query;

pub use model::{AdapterResult, Permit, PermitQuery, ResolvedLocation, SearchOutcome, SearchResponse};
pub use ports::{Geocoder, PermitAdapter};
pub use query::SearchParams;
