//! Shared application state for request handlers.

use crate::tenant::TenantResolver;
use inboxflow_workflow::Engine;
use sqlx::PgPool;
use std::sync::Arc;

/// State handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    /// The workflow engine.
    pub engine: Arc<Engine>,
    /// Channel account to tenant resolution.
    pub resolver: TenantResolver,
    /// Pool for the ingest path.
    pub pool: PgPool,
}
