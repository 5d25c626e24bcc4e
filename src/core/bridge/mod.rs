//! Per-call bridging between a telephony leg and a speech session.

mod session;
mod state;

pub use session::{
    BridgeError, BridgeOutcome, BridgeResult, BridgeSettings, DEFAULT_GREETING,
    DEFAULT_SESSION_INIT_DELAY, SessionBridge,
};
pub use state::{Interruption, MARK_NAME, SessionState};
