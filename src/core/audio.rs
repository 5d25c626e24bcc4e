//! Opaque audio payloads relayed between the call leg and the speech model.
//!
//! Both sides exchange base64 text for audio frames. The bridge never decodes
//! it: codec choice is fixed by configuration, so frames are handed from one
//! socket to the other exactly as received.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base64-encoded audio frame, passed through unmodified.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioPayload(String);

impl AudioPayload {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the encoded text in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<String> for AudioPayload {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AudioPayload {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// Frames can be large; keep log lines readable.
impl fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioPayload({} bytes)", self.len())
    }
}
