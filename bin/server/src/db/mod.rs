//! Postgres persistence for the engine and the webhook ingest path.

pub mod ingest;
pub mod store;

pub use store::PgStore;
