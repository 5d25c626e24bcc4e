//! Media stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream_handler;
use crate::handlers::twiml::MEDIA_STREAM_PATH;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for a Twilio Media Stream
///
/// # Protocol
///
/// Twilio sends JSON text frames (`connected`, `start`, `media`, `mark`,
/// `stop`) carrying base64 G.711 u-law audio. The server answers with
/// `media`, `mark` and `clear` frames addressed to the stream's `streamSid`.
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
