//! Database access: one connection per request, opened lazily and closed when the request ends.
//!
//! Layout:
//! - `connector.rs`: the `Connector`/`ReportConnection` seams and the PostgreSQL implementation
//! - `scope.rs`: the per-request connection slot
//! - `models.rs`: the report document

pub mod connector;
pub mod models;
pub mod scope;

pub use connector::{Connector, PgConnector, ReportConnection, Topology};
pub use models::Report;
pub use scope::RequestScope;
