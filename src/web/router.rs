//! Web application router and middleware setup.

use super::{handlers, websocket, AppState};
use crate::web::config::WebConfig;
use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the axum application with all routes and middleware.
pub fn create_app(config: &WebConfig, state: AppState) -> Router {
    let app = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/info", get(handlers::get_info))
        .route("/api/status", get(handlers::get_status))
        .route("/api/clients", get(handlers::get_clients))
        .route("/api/led", post(handlers::set_led))
        .route("/api/matrix", get(handlers::get_matrix))
        .route("/api/matrix/symbols", get(handlers::list_symbols))
        .route("/api/matrix/print", post(handlers::print_symbol))
        .route("/api/matrix/rotate", post(handlers::rotate_matrix))
        .route("/api/matrix/clear", post(handlers::clear_matrix))
        .route("/ws", get(websocket::websocket_handler));

    let mut app = match config.static_path.as_ref().map(PathBuf::from) {
        Some(static_path) if static_path.exists() => {
            info!("Serving static files from: {:?}", static_path);
            let app = app.nest_service("/static", ServeDir::new(&static_path));

            let index_file = static_path.join("index.html");
            if index_file.exists() {
                app.route_service("/", ServeFile::new(index_file))
            } else {
                app.route("/", get(handlers::default_index))
            }
        }
        Some(static_path) => {
            warn!(
                "Static path {:?} does not exist, serving default index",
                static_path
            );
            app.route("/", get(handlers::default_index))
        }
        None => app.route("/", get(handlers::default_index)),
    };

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
