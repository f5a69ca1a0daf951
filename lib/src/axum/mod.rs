pub mod error;
pub mod image;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::Extension;
use http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ErrorKind;
use crate::{routes, Result};
use crate::{Config, Database, Store};

pub type Router = axum::Router;

pub type ConfigExt<C = Config> = Extension<Arc<C>>;
pub type DbExt = Extension<Arc<dyn Store>>;

/// Room left for the multipart framing and the text fields on top of the
/// file itself.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Builds the complete application router: api routes, static serving of the
/// content store, and the middleware stack with shared state attached.
pub fn app(config: Arc<Config>, db: Arc<dyn Store>) -> Result<Router> {
    let origin = config.frontend_url.parse::<HeaderValue>().map_err(|e| {
        ErrorKind::InvalidConfig(format!("`frontend_url` is not a valid origin: {e}"))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    let body_limit = usize::try_from(config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    let router = image::router()
        .nest_service(routes::STATIC, ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Register common state extensions for all routes
        .layer(Extension(config))
        .layer(Extension(db));

    Ok(router)
}

/// Opens the metadata store at the configured location and starts the web
/// server.
pub async fn start(config: Config) -> Result<()> {
    crate::tracing::init(&config).unwrap_or_else(|e| {
        log::warn!("failed to initialize tracing (perhaps it was already initialized?): {e}")
    });

    config.validate()?;
    let db = Database::open(&config.database_url)?;
    start_with(Arc::new(db), config).await
}

/// Starts the web server using an already opened store.
///
/// Runs until ctrl-c is received, then flushes the store.
pub async fn start_with(db: Arc<dyn Store>, config: Config) -> Result<()> {
    config.validate()?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let addr = config.address;
    let router = app(Arc::new(config), db.clone())?;

    // Serve the application
    tracing::info!("starting server at {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped, flushing metadata store");
    db.flush()?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed listening for shutdown signal: {e}");
        // Without a signal handler there's no way to stop gracefully, keep
        // serving.
        std::future::pending::<()>().await;
    }
    tracing::info!("initiating graceful shutdown");
}
