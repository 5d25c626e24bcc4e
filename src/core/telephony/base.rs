//! Base types for the telephony side of a call.
//!
//! The call leg delivers framed control and audio events over one duplex
//! WebSocket. Inbound frames become [`TelephonyEvent`]s on a channel; outbound
//! frames are [`TelephonyCommand`]s handed to a [`TelephonySink`].

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::audio::AudioPayload;

/// Errors raised by a telephony connection.
#[derive(Debug, Error)]
pub enum TelephonyError {
    /// The call leg is gone; nothing more can be sent.
    #[error("Telephony connection closed")]
    ConnectionClosed,

    /// An outbound frame could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type TelephonyResult<T> = Result<T, TelephonyError>;

/// Inbound events from the call leg.
#[derive(Debug, Clone, PartialEq)]
pub enum TelephonyEvent {
    /// The media stream handshake, sent before `start`
    Connected {
        protocol: Option<String>,
        version: Option<String>,
    },
    /// The call stream started
    Start {
        stream_id: String,
        call_sid: Option<String>,
        account_sid: Option<String>,
    },
    /// One frame of caller audio
    Media {
        /// Call-leg clock, in ms since stream start
        timestamp_ms: u64,
        payload: AudioPayload,
    },
    /// Playback of a previously sent mark finished
    Mark { name: Option<String> },
    /// The call stream ended
    Stop,
    /// Any event name we do not act on
    Other { event: String },
}

/// Outbound frames to the call leg.
#[derive(Debug, Clone, PartialEq)]
pub enum TelephonyCommand {
    /// Queue audio for playback to the caller
    Media {
        stream_id: String,
        payload: AudioPayload,
    },
    /// Drop all audio queued for playback
    Clear { stream_id: String },
    /// Ask to be told when playback reaches this point
    Mark { stream_id: String, name: String },
}

impl TelephonyCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            TelephonyCommand::Media { .. } => "media",
            TelephonyCommand::Clear { .. } => "clear",
            TelephonyCommand::Mark { .. } => "mark",
        }
    }
}

/// Lazy sequence of inbound telephony events. Ends when the call leg closes.
pub type TelephonyEvents = mpsc::Receiver<TelephonyEvent>;

/// Outbound side of a telephony connection.
#[async_trait]
pub trait TelephonySink: Send + Sync {
    fn is_open(&self) -> bool;

    /// Enqueue a frame for the call leg.
    ///
    /// Fails with [`TelephonyError::ConnectionClosed`] once the connection is
    /// gone. Callers treat that as the end of the call and do not retry.
    async fn send(&self, command: TelephonyCommand) -> TelephonyResult<()>;

    /// Close the connection. Safe to call more than once.
    async fn close(&self);
}
