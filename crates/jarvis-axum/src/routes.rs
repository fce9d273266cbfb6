//! Route definitions and router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::bootstrap::AxumContext;
use crate::handlers;
use crate::state::AppState;

/// Build the router.
///
/// - `GET /health`: liveness check
/// - `GET /ws/audio`: WebSocket upgrade, one voice session per connection
pub fn create_router(ctx: AxumContext) -> Router {
    let state: AppState = Arc::new(ctx);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ws/audio", get(handlers::audio_ws::audio_ws))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
