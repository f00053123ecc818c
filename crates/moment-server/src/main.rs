mod config;
mod routes;
mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{Method, header::CONTENT_TYPE};
use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use moment_store::{DiskBlobStore, SqliteTabularStore};

use crate::config::Config;
use crate::routes::AppState;
use crate::service::{MomentService, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moment_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init stores
    let tabular = Arc::new(SqliteTabularStore::open(&config.db_path)?);
    let blobs = Arc::new(DiskBlobStore::new(config.blob_dir.clone())?);

    let service = Arc::new(MomentService::new(
        tabular,
        blobs,
        ServiceConfig {
            table_name: config.table_name.clone(),
            public_base_url: config.public_base_url.clone(),
        },
    ));

    let state = AppState { service };

    // CORS — permissive, the thumbnail URLs must stay embeddable from any origin
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(false);

    let app = Router::new()
        .route("/", get(routes::read_entry).post(routes::write_entry))
        .route("/thumbnail", get(routes::thumbnail))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(routes::handle_panic))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Moment server listening on {}", addr);
    info!("Public base URL: {}", config.public_base_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
