//! OpenAI Realtime API module.
//!
//! Duplex speech sessions over OpenAI's WebSocket Realtime API: caller audio
//! goes in as `input_audio_buffer.append`, assistant audio comes back as
//! `response.audio.delta`, and server-side VAD reports barge-in through
//! `input_audio_buffer.speech_started`.
//!
//! # Example
//!
//! ```rust,ignore
//! use callbridge_gateway::core::realtime::{OpenAIRealtime, RealtimeConfig, SpeechSession};
//!
//! let config = RealtimeConfig {
//!     api_key: "sk-...".to_string().into(),
//!     ..Default::default()
//! };
//!
//! let (session, mut events) = OpenAIRealtime::spawn(config)?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event?);
//! }
//! ```

mod client;
mod config;
mod messages;

pub use client::OpenAIRealtime;
pub use config::{
    DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, TEMPERATURE_RANGE,
};
pub use messages::{ClientEvent, ConversationItem, ServerEvent, SessionConfig};
