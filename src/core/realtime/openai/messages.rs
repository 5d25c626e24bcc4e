//! OpenAI Realtime API WebSocket message types.
//!
//! Only the slice of the protocol the call bridge speaks is modelled.
//!
//! Client events (sent to server):
//! - session.update - Update session configuration
//! - input_audio_buffer.append - Append caller audio to the input buffer
//! - conversation.item.create - Add item to conversation
//! - conversation.item.truncate - Cut an assistant item off mid-playback
//! - response.create - Generate a response
//!
//! Server events (received from server):
//! - session.created / session.updated
//! - input_audio_buffer.speech_started / speech_stopped
//! - conversation.item.truncated
//! - response.audio.delta - Audio data chunk
//! - response.done
//! - error
//!
//! Every other server event type deserializes to [`ServerEvent::Unknown`].

use serde::{Deserialize, Serialize};

use crate::core::audio::AudioPayload;
use crate::core::realtime::base::{Modality, SessionUpdate, SpeechEvent, TurnDetectionConfig};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for OpenAI Realtime API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetectionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl From<&SessionUpdate> for SessionConfig {
    fn from(update: &SessionUpdate) -> Self {
        Self {
            modalities: Some(update.modalities.clone()),
            instructions: Some(update.instructions.clone()),
            voice: Some(update.voice.clone()),
            input_audio_format: Some(update.input_audio_format.clone()),
            output_audio_format: Some(update.output_audio_format.clone()),
            turn_detection: Some(update.turn_detection.clone()),
            temperature: Some(update.temperature),
        }
    }
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type ("message" for everything the bridge creates)
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item role (user, assistant, system)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
}

impl ConversationItem {
    /// A user message carrying a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            item_type: "message".to_string(),
            role: Some("user".to_string()),
            content: Some(vec![ContentPart {
                content_type: "input_text".to_string(),
                text: Some(text.into()),
            }]),
        }
    }
}

/// Content part within a conversation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text, input_audio, text, audio)
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: AudioPayload },

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    /// Truncate a conversation item
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        item_id: String,
        content_index: u32,
        /// Playback position, in ms, at which the caller stopped hearing the item
        audio_end_ms: u64,
    },

    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate { .. } => "session.update",
            ClientEvent::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            ClientEvent::ConversationItemCreate { .. } => "conversation.item.create",
            ClientEvent::ConversationItemTruncate { .. } => "conversation.item.truncate",
            ClientEvent::ResponseCreate => "response.create",
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the OpenAI Realtime API.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error { error: ApiError },

    #[serde(rename = "session.created")]
    SessionCreated { session: Session },

    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: Option<Session>,
    },

    /// Speech started (VAD detected speech)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        audio_start_ms: Option<u64>,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Speech stopped (VAD detected silence)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        audio_end_ms: Option<u64>,
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "conversation.item.truncated")]
    ConversationItemTruncated {
        item_id: String,
        #[serde(default)]
        content_index: u32,
        audio_end_ms: u64,
    },

    #[serde(rename = "response.done")]
    ResponseDone { response: Response },

    /// Audio delta (audio data chunk)
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        item_id: Option<String>,
        /// Base64-encoded audio delta
        delta: AudioPayload,
    },

    #[serde(other)]
    Unknown,
}

impl From<ServerEvent> for SpeechEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::Error { error } => SpeechEvent::ProviderError {
                kind: error.error_type,
                message: error.message,
            },
            ServerEvent::SessionCreated { session } => SpeechEvent::SessionCreated {
                session_id: session.id,
            },
            ServerEvent::SessionUpdated { .. } => SpeechEvent::SessionUpdated,
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                SpeechEvent::SpeechStarted { audio_start_ms }
            }
            ServerEvent::SpeechStopped { audio_end_ms, .. } => {
                SpeechEvent::SpeechStopped { audio_end_ms }
            }
            ServerEvent::ConversationItemTruncated {
                item_id,
                audio_end_ms,
                ..
            } => SpeechEvent::ItemTruncated {
                item_id,
                audio_end_ms,
            },
            ServerEvent::ResponseDone { response } => SpeechEvent::ResponseDone {
                response_id: response.id,
                status: response.status,
            },
            ServerEvent::AudioDelta { item_id, delta, .. } => SpeechEvent::AudioDelta {
                item_id,
                payload: delta,
            },
            ServerEvent::Unknown => SpeechEvent::Other,
        }
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// Session information.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Response information.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}
