use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, twiml};
use crate::state::AppState;
use std::sync::Arc;

/// Create the plain HTTP router
///
/// - `GET /` - health check
/// - `GET|POST /incoming-call` - Twilio voice webhook
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route(
            "/incoming-call",
            get(twiml::incoming_call).post(twiml::incoming_call),
        )
        .layer(TraceLayer::new_for_http())
}
