//! Twilio Media Streams WebSocket handler
//!
//! Each accepted connection is one phone call. The handler wraps the socket
//! as the telephony leg, dials the OpenAI Realtime API, and runs a
//! [`SessionBridge`] between the two until either side goes away.

use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::bridge::{BridgeOutcome, SessionBridge};
use crate::core::realtime::OpenAIRealtime;
use crate::core::telephony::{TelephonySink, TwilioMediaStream};
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB); Twilio media frames are ~20 ms of audio
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Media stream WebSocket handler
///
/// Upgrades the connection Twilio opens after reading the TwiML `<Stream>`.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let call_id = Uuid::new_v4().to_string();
    info!(call_id = %call_id, "Media stream upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            let span = info_span!("call", call_id = %call_id);
            handle_media_stream(socket, state, call_id).instrument(span)
        })
}

/// Bridge one call until it ends.
async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>, call_id: String) {
    info!("Client connected");

    let (telephony, telephony_events) = TwilioMediaStream::spawn(socket, call_id.clone());
    let telephony = Arc::new(telephony);

    let (speech, speech_events) = match OpenAIRealtime::spawn(state.config.realtime_config()) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "Failed to start realtime session");
            telephony.close().await;
            return;
        }
    };
    info!(model = speech.model(), "Realtime session dialing");

    let bridge = SessionBridge::new(
        call_id,
        telephony,
        Arc::new(speech),
        state.config.bridge_settings(),
    );

    match bridge.run(telephony_events, speech_events).await {
        BridgeOutcome::TelephonyClosed => info!("Call ended by telephony side"),
        BridgeOutcome::SpeechClosed(e) => warn!(error = %e, "Call ended by speech session"),
        BridgeOutcome::Failed(e) => error!(error = %e, "Call bridge failed"),
    }
}
