mod auth;
mod config;
mod db;
mod errors;
mod image_gen;
mod imaging;
mod models;
mod portrait;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::image_gen::orchestrator::{JobOrchestrator, TokioPause};
use crate::image_gen::ReplicateClient;
use crate::imaging::ImagePostProcessor;
use crate::portrait::pipeline::{PipelineSettings, PortraitPipeline};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{build_s3_client, S3StorageGateway};

/// Per-request ceiling for calls to the image service and image downloads.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Portrait Studio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(
        &config.s3_endpoint,
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
    )
    .await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    // Initialize image generation
    let generation = ReplicateClient::new(
        http.clone(),
        &config.replicate_api_base,
        config.replicate_api_token.clone(),
    );
    let orchestrator = JobOrchestrator::new(Arc::new(generation), Arc::new(TokioPause));
    info!(
        "Image generation client initialized (portrait model: {}, background model: {})",
        config.portrait_model, config.background_removal_model
    );

    let storage = S3StorageGateway::new(
        s3,
        config.s3_bucket.clone(),
        &config.s3_public_base_url,
        http.clone(),
    );

    let pipeline = PortraitPipeline::new(
        orchestrator,
        ImagePostProcessor::new(http.clone(), config.portrait_max_dimension),
        ImagePostProcessor::new(http, config.background_removal_max_dimension),
        Arc::new(storage),
        PipelineSettings {
            portrait_model: config.portrait_model.clone(),
            background_removal_model: config.background_removal_model.clone(),
            storage_folder: config.storage_folder.clone(),
        },
    );

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        pipeline: Arc::new(pipeline),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the studio frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
