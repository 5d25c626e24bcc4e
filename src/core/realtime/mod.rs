//! Realtime speech-model sessions.
//!
//! [`SpeechSession`] is the outbound half of a session and [`SpeechEvents`]
//! the inbound half. OpenAI Realtime is the only provider.

mod base;
pub mod openai;

pub use base::{
    ConnectionState, Modality, RealtimeConfig, RealtimeError, RealtimeResult, SessionUpdate, SpeechEvent,
    SpeechEvents, SpeechSession, TurnDetectionConfig,
};
pub use openai::{
    DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL,
    OpenAIRealtime, OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, TEMPERATURE_RANGE,
};
