//! WebSocket Mock Server for the OpenAI Realtime API
//!
//! Accepts a single connection, answers with `session.created`, records
//! every client event, and forwards whatever the test pushes.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
    },
};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Headers seen on the most recent handshake.
#[derive(Debug, Default, Clone)]
pub struct HandshakeInfo {
    pub uri: String,
    pub authorization: Option<String>,
    pub beta: Option<String>,
}

/// What the mock does next on the server side.
#[derive(Debug)]
enum MockAction {
    Send(Value),
    Close,
}

/// WebSocket Mock Server State
#[derive(Default)]
struct MockRealtimeState {
    handshake: Mutex<HandshakeInfo>,
    connection_count: AtomicU64,
}

pub struct MockRealtimeServer {
    addr: SocketAddr,
    state: Arc<MockRealtimeState>,
    received: mpsc::UnboundedReceiver<Value>,
    script: mpsc::UnboundedSender<MockAction>,
}

impl MockRealtimeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockRealtimeState::default());
        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let (script_tx, script_rx) = mpsc::unbounded_channel();

        let accept_state = state.clone();
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            if let Err(e) = handle_connection(stream, accept_state, received_tx, script_rx).await {
                eprintln!("Mock realtime connection error: {e}");
            }
        });

        Self {
            addr,
            state,
            received: received_rx,
            script: script_tx,
        }
    }

    /// Endpoint to configure as the realtime URL.
    pub fn url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }

    pub fn handshake(&self) -> HandshakeInfo {
        self.state.handshake.lock().unwrap().clone()
    }

    pub fn connection_count(&self) -> u64 {
        self.state.connection_count.load(Ordering::SeqCst)
    }

    /// Send a server event to the connected client.
    pub fn push(&self, event: Value) {
        self.script.send(MockAction::Send(event)).unwrap();
    }

    /// Close the socket from the provider side.
    pub fn close(&self) {
        self.script.send(MockAction::Close).unwrap();
    }

    /// Next client event, or `None` once the client disconnected.
    pub async fn next_event(&mut self) -> Option<Value> {
        tokio::time::timeout(EVENT_TIMEOUT, self.received.recv())
            .await
            .expect("timed out waiting for client event")
    }

    /// Skip client events until one of `kind` arrives.
    pub async fn expect_event(&mut self, kind: &str) -> Value {
        loop {
            let event = self
                .next_event()
                .await
                .unwrap_or_else(|| panic!("client disconnected while waiting for {kind}"));
            if event["type"] == kind {
                return event;
            }
        }
    }

    /// Wait for the client to hang up, ignoring anything it still sends.
    pub async fn expect_disconnect(&mut self) {
        while self.next_event().await.is_some() {}
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<MockRealtimeState>,
    received: mpsc::UnboundedSender<Value>,
    mut script: mpsc::UnboundedReceiver<MockAction>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handshake_state = state.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        *handshake_state.handshake.lock().unwrap() = HandshakeInfo {
            uri: request.uri().to_string(),
            authorization: header("authorization"),
            beta: header("openai-beta"),
        };
        Ok(response)
    };

    let ws_stream = accept_hdr_async(stream, callback).await?;
    let (mut write, mut read) = ws_stream.split();
    state.connection_count.fetch_add(1, Ordering::SeqCst);

    let created = json!({
        "type": "session.created",
        "event_id": "event_1",
        "session": {
            "id": "sess_mock",
            "object": "realtime.session",
            "model": "gpt-4o-realtime-preview-2024-10-01"
        }
    });
    write.send(Message::Text(created.to_string().into())).await?;

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(event) = serde_json::from_str::<Value>(&text) {
                        let _ = received.send(event);
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    write.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    eprintln!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            },
            Some(action) = script.recv() => match action {
                MockAction::Send(event) => {
                    write.send(Message::Text(event.to_string().into())).await?;
                }
                MockAction::Close => {
                    write.send(Message::Close(None)).await?;
                    break;
                }
            },
        }
    }

    Ok(())
}
