//! Base traits and types for realtime speech-model sessions.
//!
//! A speech session is one duplex connection to a model that accepts caller
//! audio, speaks back, and reports voice activity. The session bridge only
//! talks to it through [`SpeechSession`] and the [`SpeechEvents`] receiver,
//! so the provider behind it can be swapped (or faked in tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;
use zeroize::Zeroizing;

use crate::core::audio::AudioPayload;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The provider closed the connection
    #[error("Connection closed by provider")]
    ConnectionClosed,

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Connection settings for a realtime provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// API key for authentication, wiped when the config is dropped
    pub api_key: Zeroizing<String>,

    /// Model to use (e.g., "gpt-4o-realtime-preview-2024-10-01")
    #[serde(default)]
    pub model: String,

    /// Endpoint override, mostly for local mocks
    #[serde(default)]
    pub url: Option<String>,

    /// Handshake timeout in seconds
    #[serde(default)]
    pub connect_timeout_seconds: Option<u64>,
}

/// Session-wide parameters pushed once after the session opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// Voice identifier for audio output
    pub voice: String,
    /// Free-form behavioral instructions
    pub instructions: String,
    /// Codec name of the caller audio we append
    pub input_audio_format: String,
    /// Codec name the model should speak in
    pub output_audio_format: String,
    /// Turn detection mode
    pub turn_detection: TurnDetectionConfig,
    /// Response modalities
    pub modalities: Vec<Modality>,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for SessionUpdate {
    fn default() -> Self {
        Self {
            voice: "alloy".to_string(),
            instructions: String::new(),
            input_audio_format: "g711_ulaw".to_string(),
            output_audio_format: "g711_ulaw".to_string(),
            turn_detection: TurnDetectionConfig::default(),
            modalities: vec![Modality::Text, Modality::Audio],
            temperature: 0.8,
        }
    }
}

/// Output modalities for a realtime response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

/// Configuration for turn detection (VAD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetectionConfig {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold (0.0 to 1.0)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Amount of audio to include before voice detection (ms)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration before end of turn (ms)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No automatic turn detection
    #[serde(rename = "none")]
    None,
}

/// Provider defaults apply for every unset threshold.
impl Default for TurnDetectionConfig {
    fn default() -> Self {
        TurnDetectionConfig::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
        }
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for realtime providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Handshake in progress
    #[default]
    Connecting,
    /// Connected and ready
    Connected,
    /// Closed, either side
    Closed,
    /// Handshake or transport failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Inbound events from the speech model, already stripped of wire details.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// WebSocket handshake finished
    Opened,
    /// The model acknowledged the session and is ready for configuration
    SessionCreated { session_id: String },
    /// The model applied a session update
    SessionUpdated,
    /// A chunk of assistant audio
    AudioDelta {
        item_id: Option<String>,
        payload: AudioPayload,
    },
    /// VAD detected the caller starting to talk
    SpeechStarted { audio_start_ms: Option<u64> },
    /// VAD detected the caller going quiet
    SpeechStopped { audio_end_ms: Option<u64> },
    /// The model confirmed a truncation
    ItemTruncated { item_id: String, audio_end_ms: u64 },
    /// A response finished
    ResponseDone {
        response_id: String,
        status: Option<String>,
    },
    /// Error event reported by the model (the session stays up)
    ProviderError { kind: String, message: String },
    /// Anything the bridge does not act on
    Other,
}

/// Lazy sequence of inbound speech events.
///
/// A connection-level failure arrives as a single `Err` item, after which the
/// channel closes.
pub type SpeechEvents = mpsc::Receiver<RealtimeResult<SpeechEvent>>;

// =============================================================================
// Session Trait
// =============================================================================

/// Outbound side of a speech-model session.
///
/// Every method only enqueues a frame on the session's writer; none waits
/// for the model to acknowledge it.
#[async_trait]
pub trait SpeechSession: Send + Sync {
    /// Whether the handshake finished and the socket is still up.
    fn is_open(&self) -> bool;

    /// Push session-wide parameters.
    async fn configure(&self, update: &SessionUpdate) -> RealtimeResult<()>;

    /// Append caller audio to the model's input buffer.
    async fn send_audio(&self, payload: AudioPayload) -> RealtimeResult<()>;

    /// Cut a conversation item's audio off at `audio_end_ms`.
    async fn truncate(
        &self,
        item_id: &str,
        content_index: u32,
        audio_end_ms: u64,
    ) -> RealtimeResult<()>;

    /// Seed the conversation with a user message and request a response,
    /// so the model speaks first.
    async fn create_initial_greeting(&self, text: &str) -> RealtimeResult<()>;

    /// Close the connection. Safe to call more than once.
    async fn close(&self);
}
