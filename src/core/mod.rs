pub mod audio;
pub mod bridge;
pub mod realtime;
pub mod telephony;

pub use audio::AudioPayload;
pub use bridge::{BridgeOutcome, BridgeSettings, SessionBridge};
pub use realtime::{OpenAIRealtime, RealtimeConfig, RealtimeError, SpeechSession};
pub use telephony::{TelephonySink, TwilioMediaStream};
