// File: crates/services/roombook_backend/src/main.rs
mod app_state;

use app_state::AppState;
use axum::{routing::get, Router};
use roombook_common::{logging, RoombookError};
use roombook_config::load_config;
use roombook_gcal::routes::{oauth_routes, routes};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    // Flushes the log file on exit.
    let _log_guard = logging::init(&config.logging);

    if let Err(e) = run(config).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Arc<roombook_config::AppConfig>) -> Result<(), RoombookError> {
    let state = AppState::new(config).await?;

    let api_router = Router::new()
        .route("/", get(|| async { "Room booking broker" }))
        .merge(routes(state.booking.clone()));

    #[allow(unused_mut)] // only mutated with the openapi feature
    let mut app = Router::new()
        .nest("/api", api_router)
        .merge(oauth_routes(state.booking.clone()));

    #[cfg(feature = "openapi")]
    {
        use roombook_gcal::doc::BookingApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        info!("Adding Swagger UI at /api/docs");
        let swagger_ui =
            SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", BookingApiDoc::openapi());
        app = app.merge(swagger_ui);
    }

    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RoombookError::ConfigError(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| RoombookError::InternalError(e.to_string()))
}
