//! Telephony call legs.
//!
//! Twilio Media Streams is the only carrier.

mod base;
pub mod twilio;

pub use base::{
    TelephonyCommand, TelephonyError, TelephonyEvent, TelephonyEvents, TelephonyResult,
    TelephonySink,
};
pub use twilio::TwilioMediaStream;
