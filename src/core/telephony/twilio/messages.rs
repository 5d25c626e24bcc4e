//! Twilio Media Streams wire format.
//!
//! Inbound frames are JSON objects tagged by `event`:
//!
//! ```json
//! {"event":"start","start":{"streamSid":"MZ..","callSid":"CA..","accountSid":"AC.."}}
//! {"event":"media","media":{"track":"inbound","chunk":"2","timestamp":"5","payload":"fn5+..."}}
//! {"event":"mark","mark":{"name":"responsePart"}}
//! ```
//!
//! Outbound frames carry the stream id at the top level as `streamSid`.

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::core::audio::AudioPayload;
use crate::core::telephony::base::{TelephonyCommand, TelephonyEvent};

// =============================================================================
// Inbound
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioInbound {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },
    Start {
        start: StartMetadata,
    },
    Media {
        media: MediaFrame,
    },
    Mark {
        #[serde(default)]
        mark: Option<MarkLabel>,
    },
    Stop {
        #[serde(default)]
        stop: Option<serde_json::Value>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaFrame {
    /// Twilio sends this as a decimal string
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: u64,
    pub payload: AudioPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkLabel {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
struct EventName {
    event: String,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid media timestamp: {s:?}"))),
    }
}

impl From<TwilioInbound> for TelephonyEvent {
    fn from(inbound: TwilioInbound) -> Self {
        match inbound {
            TwilioInbound::Connected { protocol, version } => {
                TelephonyEvent::Connected { protocol, version }
            }
            TwilioInbound::Start { start } => TelephonyEvent::Start {
                stream_id: start.stream_sid,
                call_sid: start.call_sid,
                account_sid: start.account_sid,
            },
            TwilioInbound::Media { media } => TelephonyEvent::Media {
                timestamp_ms: media.timestamp,
                payload: media.payload,
            },
            TwilioInbound::Mark { mark } => TelephonyEvent::Mark {
                name: mark.map(|m| m.name).filter(|name| !name.is_empty()),
            },
            TwilioInbound::Stop { .. } => TelephonyEvent::Stop,
            TwilioInbound::Unknown => TelephonyEvent::Other {
                event: "unknown".to_string(),
            },
        }
    }
}

/// Parse one text frame from the call leg.
pub fn parse_frame(text: &str) -> Result<TelephonyEvent, serde_json::Error> {
    match serde_json::from_str::<TwilioInbound>(text)? {
        TwilioInbound::Unknown => {
            let name: EventName = serde_json::from_str(text)?;
            Ok(TelephonyEvent::Other { event: name.event })
        }
        inbound => Ok(inbound.into()),
    }
}

// =============================================================================
// Outbound
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioOutbound {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkLabel,
    },
}

#[derive(Debug, Serialize)]
pub struct OutboundMedia {
    pub payload: AudioPayload,
}

impl From<TelephonyCommand> for TwilioOutbound {
    fn from(command: TelephonyCommand) -> Self {
        match command {
            TelephonyCommand::Media { stream_id, payload } => TwilioOutbound::Media {
                stream_sid: stream_id,
                media: OutboundMedia { payload },
            },
            TelephonyCommand::Clear { stream_id } => TwilioOutbound::Clear {
                stream_sid: stream_id,
            },
            TelephonyCommand::Mark { stream_id, name } => TwilioOutbound::Mark {
                stream_sid: stream_id,
                mark: MarkLabel { name },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let json = r#"{
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "accountSid": "AC123",
                "streamSid": "MZ123",
                "callSid": "CA123",
                "tracks": ["inbound"],
                "customParameters": {},
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
            },
            "streamSid": "MZ123"
        }"#;

        assert_eq!(
            parse_frame(json).unwrap(),
            TelephonyEvent::Start {
                stream_id: "MZ123".to_string(),
                call_sid: Some("CA123".to_string()),
                account_sid: Some("AC123".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_media_with_string_timestamp() {
        let json = r#"{
            "event": "media",
            "sequenceNumber": "3",
            "media": {"track": "inbound", "chunk": "1", "timestamp": "5", "payload": "fn5+fg=="},
            "streamSid": "MZ123"
        }"#;

        assert_eq!(
            parse_frame(json).unwrap(),
            TelephonyEvent::Media {
                timestamp_ms: 5,
                payload: AudioPayload::from("fn5+fg=="),
            }
        );
    }

    #[test]
    fn test_parse_media_with_numeric_timestamp() {
        let json = r#"{"event":"media","media":{"timestamp":400,"payload":"AA=="}}"#;
        match parse_frame(json).unwrap() {
            TelephonyEvent::Media { timestamp_ms, .. } => assert_eq!(timestamp_ms, 400),
            other => panic!("Wrong event: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(parse_frame("not json").is_err());
        assert!(parse_frame(r#"{"event":"media","media":{"timestamp":"soon","payload":"AA=="}}"#).is_err());
        assert!(parse_frame(r#"{"event":"media","media":{"payload":"AA=="}}"#).is_err());
        assert!(parse_frame(r#"{"event":"start","start":{}}"#).is_err());
        assert!(parse_frame(r#"{"no_event":true}"#).is_err());
    }

    #[test]
    fn test_parse_mark_connected_stop() {
        assert_eq!(
            parse_frame(r#"{"event":"mark","streamSid":"MZ1","mark":{"name":"responsePart"}}"#)
                .unwrap(),
            TelephonyEvent::Mark {
                name: Some("responsePart".to_string())
            }
        );
        assert_eq!(
            parse_frame(r#"{"event":"mark"}"#).unwrap(),
            TelephonyEvent::Mark { name: None }
        );
        assert_eq!(
            parse_frame(r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#).unwrap(),
            TelephonyEvent::Connected {
                protocol: Some("Call".to_string()),
                version: Some("1.0.0".to_string()),
            }
        );
        assert_eq!(
            parse_frame(r#"{"event":"stop","stop":{"callSid":"CA1"},"streamSid":"MZ1"}"#).unwrap(),
            TelephonyEvent::Stop
        );
    }

    #[test]
    fn test_unknown_event_keeps_name() {
        assert_eq!(
            parse_frame(r#"{"event":"dtmf","dtmf":{"digit":"1"}}"#).unwrap(),
            TelephonyEvent::Other {
                event: "dtmf".to_string()
            }
        );
    }

    #[test]
    fn test_outbound_serialization() {
        let media = TwilioOutbound::from(TelephonyCommand::Media {
            stream_id: "MZ1".to_string(),
            payload: AudioPayload::from("AAEC"),
        });
        assert_eq!(
            serde_json::to_value(&media).unwrap(),
            serde_json::json!({"event": "media", "streamSid": "MZ1", "media": {"payload": "AAEC"}})
        );

        let clear = TwilioOutbound::from(TelephonyCommand::Clear {
            stream_id: "MZ1".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&clear).unwrap(),
            serde_json::json!({"event": "clear", "streamSid": "MZ1"})
        );

        let mark = TwilioOutbound::from(TelephonyCommand::Mark {
            stream_id: "MZ1".to_string(),
            name: "responsePart".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&mark).unwrap(),
            serde_json::json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "responsePart"}})
        );
    }
}
