pub mod error;
pub mod routes;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use inbox_core::config::AppConfig;
use inbox_core::store::InteractionStore;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

const NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// Build the axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors_enabled = state.config.server.cors;

    let mut app = Router::new()
        .merge(routes::conversation_routes())
        .merge(routes::analytics_routes())
        .merge(routes::debug_routes())
        .merge(routes::health_routes())
        .with_state(state);

    // Every response is uncacheable.
    app = app
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_STORE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        app = app.layer(
            CorsLayer::new()
                .allow_methods([Method::GET])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any),
        );
    }

    app
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn serve(
    config: AppConfig,
    store: Option<Arc<dyn InteractionStore>>,
) -> anyhow::Result<()> {
    if store.is_none() {
        tracing::warn!("No database configured; data endpoints will return 500 until DATABASE_URL is set");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = build_router(AppState::new(config, store));

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
