//! The per-call session bridge.
//!
//! Relays caller audio to the speech model and assistant audio back to the
//! caller, tracks what the caller has actually heard through marks, and
//! truncates the assistant's turn when the caller talks over it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::select;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::state::SessionState;
use crate::core::audio::AudioPayload;
use crate::core::realtime::{
    RealtimeError, SessionUpdate, SpeechEvent, SpeechEvents, SpeechSession,
};
use crate::core::telephony::{
    TelephonyCommand, TelephonyError, TelephonyEvent, TelephonyEvents, TelephonySink,
};

/// User message that makes the model open the conversation.
pub const DEFAULT_GREETING: &str = "Hello! How can I assist you today?";

/// How long to wait after the socket opens for `session.created` before
/// configuring the session anyway.
pub const DEFAULT_SESSION_INIT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Telephony error: {0}")]
    Telephony(#[from] TelephonyError),

    #[error("Speech session error: {0}")]
    Speech(#[from] RealtimeError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Why a bridge stopped.
#[derive(Debug)]
pub enum BridgeOutcome {
    /// The call leg hung up or dropped
    TelephonyClosed,
    /// The speech session ended or never came up
    SpeechClosed(RealtimeError),
    /// Sending to one side failed mid-call
    Failed(BridgeError),
}

/// Static per-call settings.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub session: SessionUpdate,
    pub greeting: String,
    pub session_init_delay: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            session: SessionUpdate::default(),
            greeting: DEFAULT_GREETING.to_string(),
            session_init_delay: DEFAULT_SESSION_INIT_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionInit {
    AwaitingOpen,
    Scheduled(Instant),
    Done,
}

pub struct SessionBridge {
    call_id: String,
    telephony: Arc<dyn TelephonySink>,
    speech: Arc<dyn SpeechSession>,
    settings: BridgeSettings,
    state: SessionState,
    init: SessionInit,
}

impl SessionBridge {
    pub fn new(
        call_id: impl Into<String>,
        telephony: Arc<dyn TelephonySink>,
        speech: Arc<dyn SpeechSession>,
        settings: BridgeSettings,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            telephony,
            speech,
            settings,
            state: SessionState::new(),
            init: SessionInit::AwaitingOpen,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_session_initialized(&self) -> bool {
        self.init == SessionInit::Done
    }

    /// Drive the call until either side ends it, then close both sides.
    pub async fn run(
        mut self,
        mut telephony_events: TelephonyEvents,
        mut speech_events: SpeechEvents,
    ) -> BridgeOutcome {
        let init_timer = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(init_timer);

        let outcome = loop {
            let init_deadline = match self.init {
                SessionInit::Scheduled(at) => Some(at),
                _ => None,
            };
            if let Some(at) = init_deadline
                && init_timer.deadline() != at
            {
                init_timer.as_mut().reset(at);
            }

            select! {
                event = telephony_events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_telephony_event(event).await {
                            break BridgeOutcome::Failed(e);
                        }
                    }
                    None => break BridgeOutcome::TelephonyClosed,
                },
                event = speech_events.recv() => match event {
                    Some(Ok(event)) => {
                        if let Err(e) = self.handle_speech_event(event).await {
                            break BridgeOutcome::Failed(e);
                        }
                    }
                    Some(Err(e)) => break BridgeOutcome::SpeechClosed(e),
                    None => break BridgeOutcome::SpeechClosed(RealtimeError::ConnectionClosed),
                },
                _ = &mut init_timer, if init_deadline.is_some() => {
                    debug!(call_id = %self.call_id, "No session.created yet, configuring after delay");
                    if let Err(e) = self.initialize_session().await {
                        break BridgeOutcome::Failed(e);
                    }
                }
            }
        };

        self.telephony.close().await;
        self.speech.close().await;
        outcome
    }

    pub async fn handle_telephony_event(&mut self, event: TelephonyEvent) -> BridgeResult<()> {
        match event {
            TelephonyEvent::Start {
                stream_id,
                call_sid,
                ..
            } => {
                info!(
                    call_id = %self.call_id,
                    stream_id = %stream_id,
                    call_sid = call_sid.as_deref().unwrap_or_default(),
                    "Incoming stream has started"
                );
                self.state.start_stream(stream_id);
            }
            TelephonyEvent::Media {
                timestamp_ms,
                payload,
            } => {
                self.state.record_media(timestamp_ms);
                self.forward_caller_audio(payload).await?;
            }
            TelephonyEvent::Mark { name } => {
                if self.state.acknowledge_mark().is_some() {
                    trace!(call_id = %self.call_id, mark = ?name, "Mark acknowledged");
                }
            }
            TelephonyEvent::Connected { protocol, version } => {
                debug!(call_id = %self.call_id, ?protocol, ?version, "Media stream connected");
            }
            TelephonyEvent::Stop => {
                info!(call_id = %self.call_id, "Media stream stopped");
            }
            TelephonyEvent::Other { event } => {
                debug!(call_id = %self.call_id, event = %event, "Ignoring telephony event");
            }
        }
        Ok(())
    }

    pub async fn handle_speech_event(&mut self, event: SpeechEvent) -> BridgeResult<()> {
        match event {
            SpeechEvent::Opened => {
                info!(call_id = %self.call_id, "Speech session connected");
                if self.init == SessionInit::AwaitingOpen {
                    self.init =
                        SessionInit::Scheduled(Instant::now() + self.settings.session_init_delay);
                }
            }
            SpeechEvent::SessionCreated { session_id } => {
                info!(call_id = %self.call_id, session_id = %session_id, "Speech session created");
                self.initialize_session().await?;
            }
            SpeechEvent::SessionUpdated => {
                debug!(call_id = %self.call_id, "Speech session updated");
            }
            SpeechEvent::AudioDelta { item_id, payload } => {
                self.forward_assistant_audio(item_id, payload).await?;
            }
            SpeechEvent::SpeechStarted { audio_start_ms } => {
                debug!(call_id = %self.call_id, ?audio_start_ms, "Caller speech started");
                self.handle_barge_in().await?;
            }
            SpeechEvent::SpeechStopped { audio_end_ms } => {
                debug!(call_id = %self.call_id, ?audio_end_ms, "Caller speech stopped");
            }
            SpeechEvent::ItemTruncated {
                item_id,
                audio_end_ms,
            } => {
                debug!(call_id = %self.call_id, item_id = %item_id, audio_end_ms, "Item truncated");
            }
            SpeechEvent::ResponseDone {
                response_id,
                status,
            } => {
                debug!(call_id = %self.call_id, response_id = %response_id, ?status, "Response done");
            }
            SpeechEvent::ProviderError { kind, message } => {
                warn!(call_id = %self.call_id, kind = %kind, "Speech model error: {}", message);
            }
            SpeechEvent::Other => {}
        }
        Ok(())
    }

    /// Push the session configuration and the greeting, once per call.
    pub async fn initialize_session(&mut self) -> BridgeResult<()> {
        if self.init == SessionInit::Done {
            return Ok(());
        }
        self.init = SessionInit::Done;

        debug!(call_id = %self.call_id, voice = %self.settings.session.voice, "Sending session update");
        self.speech.configure(&self.settings.session).await?;
        self.speech
            .create_initial_greeting(&self.settings.greeting)
            .await?;
        Ok(())
    }

    async fn forward_caller_audio(&mut self, payload: AudioPayload) -> BridgeResult<()> {
        if !self.speech.is_open() {
            debug!(call_id = %self.call_id, "Speech session not open, dropping caller audio");
            return Ok(());
        }
        match self.speech.send_audio(payload).await {
            Ok(()) => Ok(()),
            Err(RealtimeError::NotConnected) => {
                debug!(call_id = %self.call_id, "Speech session not open, dropping caller audio");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn forward_assistant_audio(
        &mut self,
        item_id: Option<String>,
        payload: AudioPayload,
    ) -> BridgeResult<()> {
        if payload.is_empty() {
            return Ok(());
        }
        let Some(stream_id) = self.state.stream_id().map(str::to_string) else {
            debug!(call_id = %self.call_id, "No stream yet, dropping assistant audio");
            return Ok(());
        };

        self.telephony
            .send(TelephonyCommand::Media {
                stream_id: stream_id.clone(),
                payload,
            })
            .await?;

        self.state.record_assistant_audio(item_id);
        let name = self.state.push_mark();
        self.telephony
            .send(TelephonyCommand::Mark {
                stream_id,
                name: name.to_string(),
            })
            .await?;
        Ok(())
    }

    async fn handle_barge_in(&mut self) -> BridgeResult<()> {
        let Some(interruption) = self.state.interrupt() else {
            return Ok(());
        };

        info!(
            call_id = %self.call_id,
            item_id = interruption.item_id.as_deref().unwrap_or_default(),
            audio_end_ms = interruption.audio_end_ms,
            "Caller interrupted assistant"
        );

        if let Some(item_id) = &interruption.item_id {
            self.speech
                .truncate(item_id, 0, interruption.audio_end_ms)
                .await?;
        }
        if let Some(stream_id) = self.state.stream_id() {
            self.telephony
                .send(TelephonyCommand::Clear {
                    stream_id: stream_id.to_string(),
                })
                .await?;
        }
        Ok(())
    }
}
