//! Twilio Media Streams connection over an accepted axum WebSocket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::messages::{TwilioOutbound, parse_frame};
use crate::core::telephony::base::{
    TelephonyCommand, TelephonyError, TelephonyEvent, TelephonyEvents, TelephonyResult,
    TelephonySink,
};

/// Channel buffer for outbound frames. Sized for audio bursts from the model.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Channel buffer for inbound events.
const EVENT_BUFFER_SIZE: usize = 1024;

/// How long the writer waits to hand the peer a close frame.
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

enum OutboundRoute {
    /// Encoded JSON frame
    Frame(String),
    Close,
}

/// One call leg's media stream.
///
/// Owns a writer task (route channel to socket) and a reader task (socket to
/// [`TelephonyEvents`]). Either task ending marks the stream closed.
pub struct TwilioMediaStream {
    call_id: String,
    outbound: mpsc::Sender<OutboundRoute>,
    open: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl TwilioMediaStream {
    pub fn spawn(socket: WebSocket, call_id: impl Into<String>) -> (Self, TelephonyEvents) {
        Self::spawn_on(socket, call_id)
    }

    fn spawn_on<S>(socket: S, call_id: impl Into<String>) -> (Self, TelephonyEvents)
    where
        S: Stream<Item = Result<Message, axum::Error>>
            + Sink<Message, Error = axum::Error>
            + Send
            + 'static,
    {
        let call_id = call_id.into();
        let (mut sender, mut receiver) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundRoute>(CHANNEL_BUFFER_SIZE);
        let (event_tx, event_rx) = mpsc::channel::<TelephonyEvent>(EVENT_BUFFER_SIZE);
        let open = Arc::new(AtomicBool::new(true));
        let shutdown = CancellationToken::new();

        // Sender task for outgoing frames. Every socket write races shutdown so
        // a peer that stopped reading cannot wedge teardown.
        {
            let open = open.clone();
            let shutdown = shutdown.clone();
            let call_id = call_id.clone();
            tokio::spawn(async move {
                loop {
                    let route = select! {
                        biased;
                        _ = shutdown.cancelled() => OutboundRoute::Close,
                        route = outbound_rx.recv() => route.unwrap_or(OutboundRoute::Close),
                    };

                    let json = match route {
                        OutboundRoute::Frame(json) => json,
                        OutboundRoute::Close => {
                            info!(%call_id, "Closing telephony WebSocket connection");
                            if timeout(CLOSE_FRAME_TIMEOUT, sender.send(Message::Close(None)))
                                .await
                                .is_err()
                            {
                                debug!(%call_id, "Peer did not take the close frame");
                            }
                            break;
                        }
                    };

                    select! {
                        _ = shutdown.cancelled() => continue,
                        result = sender.send(Message::Text(json.into())) => {
                            if let Err(e) = result {
                                warn!(%call_id, "Failed to send telephony frame: {}", e);
                                break;
                            }
                        }
                    }
                }

                open.store(false, Ordering::SeqCst);
                shutdown.cancel();
            });
        }

        // Reader task for incoming frames
        {
            let open = open.clone();
            let shutdown = shutdown.clone();
            let call_id = call_id.clone();
            tokio::spawn(async move {
                loop {
                    select! {
                        _ = shutdown.cancelled() => break,
                        msg = receiver.next() => match msg {
                            Some(Ok(Message::Text(text))) => match parse_frame(text.as_str()) {
                                Ok(event) => {
                                    if event_tx.send(event).await.is_err() {
                                        debug!(%call_id, "Telephony event receiver dropped");
                                        break;
                                    }
                                }
                                Err(e) => {
                                    warn!(%call_id, "Skipping malformed telephony frame: {}", e);
                                }
                            },
                            Some(Ok(Message::Close(_))) => {
                                info!(%call_id, "Telephony WebSocket closed by peer");
                                break;
                            }
                            // Binary, ping and pong frames carry nothing for us
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!(%call_id, "Telephony WebSocket error: {}", e);
                                break;
                            }
                            None => {
                                info!(%call_id, "Telephony WebSocket stream ended");
                                break;
                            }
                        }
                    }
                }

                open.store(false, Ordering::SeqCst);
            });
        }

        (
            Self {
                call_id,
                outbound: outbound_tx,
                open,
                shutdown,
            },
            event_rx,
        )
    }
}

#[async_trait]
impl TelephonySink for TwilioMediaStream {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send(&self, command: TelephonyCommand) -> TelephonyResult<()> {
        if !self.is_open() {
            return Err(TelephonyError::ConnectionClosed);
        }
        trace!(call_id = %self.call_id, command = command.kind(), "Queueing telephony frame");

        let json = serde_json::to_string(&TwilioOutbound::from(command))?;
        self.outbound
            .send(OutboundRoute::Frame(json))
            .await
            .map_err(|_| TelephonyError::ConnectionClosed)
    }

    /// Never waits on the outbound queue; the writer task sends the close
    /// frame once it observes the cancellation.
    async fn close(&self) {
        self.shutdown.cancel();
        if self.open.swap(false, Ordering::SeqCst) {
            debug!(call_id = %self.call_id, "Closing telephony stream");
            let _ = self.outbound.try_send(OutboundRoute::Close);
        }
    }
}
