pub mod embed;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(embed::index))
        .route("/info", get(routes::info::get_info))
        .route(
            "/trigger",
            post(routes::trigger::post_trigger).delete(routes::trigger::cancel_trigger),
        )
        .route("/status", get(routes::status::get_status))
        .route("/healthz", get(routes::status::healthz))
        .fallback(embed::static_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve on a pre-bound listener until the server stops.
///
/// Taking a bound `TcpListener` lets the caller log the actual port first
/// (useful when `port = 0` and the OS picks a free port).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(app_state);

    tracing::info!("timetrigger listening on port {actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
