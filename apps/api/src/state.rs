use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::portrait::pipeline::PortraitPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Resolver, orchestrator, post-processors and storage wired together once at startup.
    pub pipeline: Arc<PortraitPipeline>,
}
