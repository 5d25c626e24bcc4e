//! OpenAI Realtime API client implementation.
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: base64 text in the configured codec, relayed untouched
//!
//! [`OpenAIRealtime::spawn`] returns immediately. The handshake and the socket
//! loop run on a background task that feeds a [`SpeechEvents`] channel; the
//! returned handle enqueues outbound events for that task.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use url::Url;
use zeroize::Zeroizing;

use super::config::{DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL};
use super::messages::{ClientEvent, ConversationItem, ServerEvent, SessionConfig};
use crate::core::audio::AudioPayload;
use crate::core::realtime::base::{
    ConnectionState, RealtimeConfig, RealtimeError, RealtimeResult, SessionUpdate, SpeechEvent,
    SpeechEvents, SpeechSession,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for inbound events handed to the bridge.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// OpenAI Realtime Client
// =============================================================================

/// Handle to one OpenAI Realtime session.
///
/// Dropping the handle shuts the connection task down.
pub struct OpenAIRealtime {
    model: String,
    ws_sender: mpsc::Sender<ClientEvent>,
    state: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
}

impl OpenAIRealtime {
    /// Start connecting in the background.
    ///
    /// Fails synchronously only on configuration problems; network failures
    /// arrive later as the terminal `Err` item of the event channel.
    pub fn spawn(config: RealtimeConfig) -> RealtimeResult<(Self, SpeechEvents)> {
        if config.api_key.trim().is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            DEFAULT_REALTIME_MODEL.to_string()
        } else {
            config.model.clone()
        };
        let url = build_ws_url(
            config.url.as_deref().unwrap_or(OPENAI_REALTIME_URL),
            &model,
        )?;
        let request = build_request(&url, &config.api_key)?;
        let connect_timeout = Duration::from_secs(
            config
                .connect_timeout_seconds
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECONDS),
        );

        let (ws_sender, ws_receiver) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let shutdown = CancellationToken::new();

        tokio::spawn(run_connection(ConnectionTask {
            request,
            connect_timeout,
            outgoing: ws_receiver,
            events: event_tx,
            state: state_tx,
            shutdown: shutdown.clone(),
        }));

        Ok((
            Self {
                model,
                ws_sender,
                state: state_rx,
                shutdown,
            },
            event_rx,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Send an event to the WebSocket.
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        tracing::trace!(event = event.kind(), "Queueing realtime client event");
        self.ws_sender
            .send(event)
            .await
            .map_err(|_| RealtimeError::ConnectionClosed)
    }
}

impl Drop for OpenAIRealtime {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl SpeechSession for OpenAIRealtime {
    fn is_open(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    async fn configure(&self, update: &SessionUpdate) -> RealtimeResult<()> {
        self.send_event(ClientEvent::SessionUpdate {
            session: SessionConfig::from(update),
        })
        .await
    }

    async fn send_audio(&self, payload: AudioPayload) -> RealtimeResult<()> {
        self.send_event(ClientEvent::InputAudioBufferAppend { audio: payload })
            .await
    }

    async fn truncate(
        &self,
        item_id: &str,
        content_index: u32,
        audio_end_ms: u64,
    ) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ConversationItemTruncate {
            item_id: item_id.to_string(),
            content_index,
            audio_end_ms,
        })
        .await
    }

    async fn create_initial_greeting(&self, text: &str) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ConversationItemCreate {
            item: ConversationItem::user_text(text),
        })
        .await?;
        self.send_event(ClientEvent::ResponseCreate).await
    }

    async fn close(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("Closing OpenAI Realtime session");
        }
        self.shutdown.cancel();
    }
}

// =============================================================================
// Connection Task
// =============================================================================

struct ConnectionTask {
    request: http::Request<()>,
    connect_timeout: Duration,
    outgoing: mpsc::Receiver<ClientEvent>,
    events: mpsc::Sender<RealtimeResult<SpeechEvent>>,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
}

async fn run_connection(task: ConnectionTask) {
    let ConnectionTask {
        request,
        connect_timeout,
        mut outgoing,
        events,
        state,
        shutdown,
    } = task;

    let connect = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(request));
    let ws_stream = tokio::select! {
        _ = shutdown.cancelled() => {
            state.send_replace(ConnectionState::Closed);
            return;
        }
        result = connect => match result {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                tracing::error!("Failed to connect to OpenAI Realtime API: {}", e);
                state.send_replace(ConnectionState::Failed);
                let _ = events
                    .send(Err(RealtimeError::ConnectionFailed(e.to_string())))
                    .await;
                return;
            }
            Err(_) => {
                tracing::error!(
                    "OpenAI Realtime handshake timed out after {}s",
                    connect_timeout.as_secs()
                );
                state.send_replace(ConnectionState::Failed);
                let _ = events
                    .send(Err(RealtimeError::Timeout(format!(
                        "no handshake after {}s",
                        connect_timeout.as_secs()
                    ))))
                    .await;
                return;
            }
        }
    };

    tracing::info!("Connected to OpenAI Realtime API");
    state.send_replace(ConnectionState::Connected);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    if events.send(Ok(SpeechEvent::Opened)).await.is_err() {
        let _ = ws_sink.send(Message::Close(None)).await;
        state.send_replace(ConnectionState::Closed);
        return;
    }

    let failure = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = ws_sink.send(Message::Close(None)).await;
                break None;
            }

            // Handle outgoing messages
            Some(event) = outgoing.recv() => {
                let json = match serde_json::to_string(&event) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::error!("Failed to serialize {}: {}", event.kind(), e);
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break Some(RealtimeError::SerializationError(format!(
                            "{}: {e}",
                            event.kind()
                        )));
                    }
                };

                if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                    tracing::error!("Failed to send WebSocket message: {}", e);
                    break Some(RealtimeError::WebSocketError(e.to_string()));
                }
            }

            // Handle incoming messages
            msg = ws_stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if events.send(Ok(event.into())).await.is_err() {
                                tracing::debug!("Speech event receiver dropped, closing");
                                let _ = ws_sink.send(Message::Close(None)).await;
                                break None;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Failed to parse server event: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "WebSocket closed by server");
                    break Some(RealtimeError::ConnectionClosed);
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                        tracing::error!("Failed to send pong: {}", e);
                        break Some(RealtimeError::WebSocketError(e.to_string()));
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!("WebSocket error: {}", e);
                    break Some(RealtimeError::WebSocketError(e.to_string()));
                }
                None => break Some(RealtimeError::ConnectionClosed),
            }
        }
    };

    match failure {
        Some(err) => {
            state.send_replace(match err {
                RealtimeError::ConnectionClosed => ConnectionState::Closed,
                _ => ConnectionState::Failed,
            });
            let _ = events.send(Err(err)).await;
        }
        None => {
            state.send_replace(ConnectionState::Closed);
        }
    }
    tracing::debug!("OpenAI Realtime connection task finished");
}

// =============================================================================
// Request Construction
// =============================================================================

/// Build the WebSocket URL with model parameter.
fn build_ws_url(base: &str, model: &str) -> RealtimeResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| RealtimeError::InvalidConfiguration(format!("Invalid realtime URL: {e}")))?;
    url.query_pairs_mut().append_pair("model", model);
    Ok(url)
}

fn build_request(url: &Url, api_key: &str) -> RealtimeResult<http::Request<()>> {
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(RealtimeError::InvalidConfiguration(
                "Realtime URL has no host".to_string(),
            ));
        }
    };

    let authorization = Zeroizing::new(format!("Bearer {api_key}"));

    http::Request::builder()
        .uri(url.as_str())
        .header("Authorization", authorization.as_str())
        .header("OpenAI-Beta", "realtime=v1")
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Host", host)
        .body(())
        .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str) -> RealtimeConfig {
        RealtimeConfig {
            api_key: "test_key".to_string().into(),
            model: String::new(),
            url: Some(url.to_string()),
            connect_timeout_seconds: Some(2),
        }
    }

    /// An address nothing is listening on.
    async fn closed_port_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{addr}/v1/realtime")
    }

    #[test]
    fn test_build_ws_url() {
        let url = build_ws_url(OPENAI_REALTIME_URL, "gpt-4o-realtime-preview-2024-10-01").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview-2024-10-01"
        );

        assert!(build_ws_url("not a url", "m").is_err());
    }

    #[test]
    fn test_build_request_headers() {
        let url = build_ws_url("ws://127.0.0.1:9001/v1/realtime", "m").unwrap();
        let request = build_request(&url, "sk-test").unwrap();

        assert_eq!(request.headers()["Authorization"], "Bearer sk-test");
        assert_eq!(request.headers()["OpenAI-Beta"], "realtime=v1");
        assert_eq!(request.headers()["Host"], "127.0.0.1:9001");
        assert_eq!(request.uri().query(), Some("model=m"));
    }

    #[tokio::test]
    async fn test_api_key_required() {
        let config = RealtimeConfig {
            api_key: String::new().into(),
            ..Default::default()
        };

        match OpenAIRealtime::spawn(config) {
            Err(RealtimeError::AuthenticationFailed(_)) => {}
            _ => panic!("Expected AuthenticationFailed error"),
        }
    }

    #[tokio::test]
    async fn test_default_model_applied() {
        let url = closed_port_url().await;
        let (realtime, _events) = OpenAIRealtime::spawn(test_config(&url)).unwrap();
        assert_eq!(realtime.model(), DEFAULT_REALTIME_MODEL);
    }

    #[tokio::test]
    async fn test_send_audio_requires_connection() {
        let url = closed_port_url().await;
        let (realtime, _events) = OpenAIRealtime::spawn(test_config(&url)).unwrap();

        let result = realtime.send_audio(AudioPayload::from("AAAA")).await;
        assert!(matches!(result, Err(RealtimeError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connection_failure_is_terminal_event() {
        let url = closed_port_url().await;
        let (realtime, mut events) = OpenAIRealtime::spawn(test_config(&url)).unwrap();

        match events.recv().await {
            Some(Err(RealtimeError::ConnectionFailed(_))) => {}
            other => panic!("Expected ConnectionFailed, got {other:?}"),
        }
        assert!(events.recv().await.is_none());
        assert_eq!(realtime.connection_state(), ConnectionState::Failed);
        assert!(!realtime.is_open());
    }
}
