use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState, StatusBody};
use axum::{extract::FromRef, routing::get, Json, Router};
use common::{
    storage::{
        content_store::ContentStore,
        db::SurrealDbClient,
        vector_index::{surreal::SurrealVectorBackend, VectorIndex},
    },
    utils::{
        config::{get_config, AppConfig},
        embedding::EmbeddingProvider,
    },
};
use ingestion_pipeline::{IngestionConfig, IngestionPipeline};
use retrieval_pipeline::{generator_from_config, RagOrchestrator};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            config.surrealdb_username.as_deref(),
            config.surrealdb_password.as_deref(),
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );
    let backend = SurrealVectorBackend::new(db).await?;

    let embedding_provider = EmbeddingProvider::from_config(&config).await?;
    let index = VectorIndex::new(Arc::new(backend), Arc::new(embedding_provider));
    info!(
        vector_backend = index.backend_label(),
        "Vector index initialized"
    );

    let content_store = Arc::new(
        ContentStore::open(&config.uploads_dir, config.max_upload_size_bytes).await?,
    );
    let generator = generator_from_config(&config)?;

    let api_state = build_state(config.clone(), content_store, index, generator);
    let app = build_router(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn build_state(
    config: AppConfig,
    content_store: Arc<ContentStore>,
    index: VectorIndex,
    generator: Arc<dyn retrieval_pipeline::Generator>,
) -> ApiState {
    let ingestion = IngestionPipeline::new(
        content_store,
        index.clone(),
        IngestionConfig::from_app_config(&config),
    );
    let rag = RagOrchestrator::from_config(index.clone(), generator, &config);

    ApiState::new(config, Arc::new(ingestion), Arc::new(rag), index)
}

fn build_router(api_state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(StatusBody::OK) }))
        .nest("/api/v1", api_routes_v1(&api_state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(AppState { api_state })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}
