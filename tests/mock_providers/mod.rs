//! Mock provider servers for integration tests
//!
//! - `realtime_mock`: OpenAI Realtime WebSocket endpoint that records client
//!   events and plays back scripted server events

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod realtime_mock;
