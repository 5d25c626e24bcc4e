//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `twiml` - Voice webhook answering Twilio with a `<Connect><Stream>` document
//! - `media_stream` - Twilio Media Streams WebSocket, one bridged call per connection

pub mod api;
pub mod media_stream;
pub mod twiml;

pub use media_stream::media_stream_handler;
pub use twiml::incoming_call;
