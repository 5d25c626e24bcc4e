//! Voice webhook.
//!
//! Twilio requests this when a call comes in. The answer tells it to play a
//! short prompt and then open a media stream back to `/media-stream` on the
//! host the caller reached us through.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::utils::url_validation::validate_public_host;

const TWIML_CONTENT_TYPE: &str = "text/xml";

/// Path Twilio opens the media stream on.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// Answer an incoming call with TwiML (GET or POST).
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let host = resolve_host(state.config.public_host.as_deref(), &headers)?;
    debug!(host = %host, "Answering incoming call");

    let body = render_connect_twiml(&host)?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(TWIML_CONTENT_TYPE))],
        body,
    )
        .into_response())
}

/// The configured public host wins; otherwise the request's `Host` header.
fn resolve_host(public_host: Option<&str>, headers: &HeaderMap) -> AppResult<String> {
    if let Some(host) = public_host {
        return Ok(host.to_string());
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing Host header".to_string()))?;

    validate_public_host(host).map_err(|e| {
        warn!(host, error = %e, "Rejecting incoming call with invalid Host header");
        AppError::BadRequest(format!("Invalid Host header: {e}"))
    })?;

    Ok(host.to_string())
}

fn render_connect_twiml(host: &str) -> AppResult<String> {
    let stream_url = format!("wss://{host}{MEDIA_STREAM_PATH}");
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    write_twiml_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write_twiml_event(&mut writer, Event::Start(BytesStart::new("Response")))?;
    write_say(
        &mut writer,
        "Please wait while we connect your call to the AI assistant.",
    )?;

    let mut pause = BytesStart::new("Pause");
    pause.push_attribute(("length", "1"));
    write_twiml_event(&mut writer, Event::Empty(pause))?;

    write_say(&mut writer, "Okay, you can start talking!")?;
    write_twiml_event(&mut writer, Event::Start(BytesStart::new("Connect")))?;

    let mut stream = BytesStart::new("Stream");
    stream.push_attribute(("url", stream_url.as_str()));
    write_twiml_event(&mut writer, Event::Empty(stream))?;

    write_twiml_event(&mut writer, Event::End(BytesEnd::new("Connect")))?;
    write_twiml_event(&mut writer, Event::End(BytesEnd::new("Response")))?;

    let xml = writer.into_inner().into_inner();
    String::from_utf8(xml).map_err(|e| AppError::Internal(format!("TwiML is not UTF-8: {e}")))
}

fn write_say(writer: &mut Writer<Cursor<Vec<u8>>>, text: &str) -> AppResult<()> {
    write_twiml_event(writer, Event::Start(BytesStart::new("Say")))?;
    write_twiml_event(writer, Event::Text(BytesText::new(text)))?;
    write_twiml_event(writer, Event::End(BytesEnd::new("Say")))
}

fn write_twiml_event(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> AppResult<()> {
    writer
        .write_event(event)
        .map_err(|e| AppError::Internal(format!("Failed to write TwiML: {e}")))
}
