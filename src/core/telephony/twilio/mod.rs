//! Twilio Media Streams.
//!
//! A `<Connect><Stream>` TwiML verb points the call at our `/media-stream`
//! WebSocket; Twilio then streams 8 kHz u-law caller audio as base64 and plays
//! back whatever media frames we send, acknowledging marks as playback
//! passes them.

mod connection;
mod messages;

pub use connection::TwilioMediaStream;
pub use messages::{TwilioInbound, TwilioOutbound, parse_frame};
