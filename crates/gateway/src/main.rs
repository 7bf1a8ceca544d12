//! Arandu API Gateway
//!
//! The entry point for all external API requests:
//! - Job submission and polling
//! - Review submission, artifacts, and badges
//! - Paper hosting with Range-capable streaming
//! - Metrics summary

mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use arandu_common::config::AppConfig;
use arandu_common::db::{self, Repository};
use arandu_common::queue::Queue;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: Repository,
    pub queue: Queue,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    arandu_common::logging::init_tracing("gateway");

    info!("Starting Arandu API Gateway v{}", arandu_common::VERSION);

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    let config = Arc::new(config);

    info!("Connecting to database...");
    let conn = db::connect(&config.database).await?;
    let repository = Repository::new(conn);

    info!("Connecting to redis queue...");
    let queue = Queue::connect(&config.redis.url).await?;

    let state = AppState { config: config.clone(), repository, queue };
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cors = match state.config.api.web_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Uploads are bounded by the PDF size cap plus multipart overhead.
    let body_limit = (state.config.max_pdf_size_bytes() + 1024 * 1024) as usize;

    let routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Job endpoints
        .route("/jobs", post(handlers::jobs::create_job))
        .route("/jobs/{id}", get(handlers::jobs::get_job))
        .route("/jobs/{id}/status", get(handlers::jobs::get_job_status))
        .route(
            "/jobs/{id}/artifacts/{artifact_type}",
            get(handlers::jobs::get_job_artifact),
        )
        // Review endpoints
        .route("/reviews", post(handlers::reviews::create_review))
        .route("/reviews/{id}", get(handlers::reviews::get_review))
        .route("/reviews/{id}/status", get(handlers::reviews::get_review_status))
        .route("/reviews/{id}/score", get(handlers::reviews::get_review_score))
        .route(
            "/reviews/{id}/artifacts/{artifact}",
            get(handlers::reviews::get_review_artifact),
        )
        // Badge endpoints
        .route("/badges/{review_id}/{badge_file}", get(handlers::badges::get_badge))
        // Paper hosting endpoints
        .route("/api/v1/papers", post(handlers::papers::create_paper))
        .route("/api/v1/papers/{aid}", get(handlers::papers::get_paper))
        .route("/api/v1/papers/{aid}/versions", post(handlers::papers::create_paper_version))
        .route(
            "/api/v1/papers/{aid}/viewer",
            get(handlers::papers::get_paper_viewer).head(handlers::papers::head_paper_viewer),
        )
        .route("/api/v1/papers/{aid}/claims", get(handlers::papers::list_paper_claims))
        // Metrics
        .route("/metrics", get(handlers::metrics::get_metrics));

    routes
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
