// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod config;
pub mod extract;
pub mod ingest;
pub mod query;
pub mod schema;
pub mod stats;
pub mod store;
