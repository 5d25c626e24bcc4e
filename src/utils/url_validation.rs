//! URL validation for the endpoints this server dials or advertises.
//!
//! - The realtime endpoint must be a WebSocket URL. Plain `ws` is only
//!   accepted for loopback hosts (local mocks); anything else needs `wss`.
//! - The public host placed in TwiML must be a bare `host[:port]`, since it
//!   is spliced into `wss://{host}/media-stream`.

use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::warn;
use url::{Host, Url};

/// Errors that can occur during URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be ws or wss, got: {0}")]
    WebSocketSchemeRequired(String),

    #[error("Plain ws is only allowed for loopback hosts, got: {0}")]
    SecureSchemeRequired(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("Invalid host: {0}")]
    InvalidHost(String),
}

/// Whether the host is the local machine.
pub fn is_loopback_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => ip.is_loopback(),
        Host::Ipv6(ip) => {
            ip.is_loopback() || ip.to_ipv4_mapped().is_some_and(|v4: Ipv4Addr| v4.is_loopback())
        }
    }
}

/// Validates the realtime speech-model endpoint.
///
/// # Example
/// ```rust,ignore
/// use callbridge_gateway::utils::url_validation::validate_realtime_url;
///
/// assert!(validate_realtime_url("wss://api.openai.com/v1/realtime").is_ok());
/// assert!(validate_realtime_url("ws://127.0.0.1:9000/v1/realtime").is_ok());
/// assert!(validate_realtime_url("ws://api.openai.com/v1/realtime").is_err());
/// assert!(validate_realtime_url("https://api.openai.com/v1/realtime").is_err());
/// ```
pub fn validate_realtime_url(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url)?;

    let host = parsed.host().ok_or(UrlValidationError::MissingHost)?;

    match parsed.scheme() {
        "wss" => {}
        "ws" => {
            if !is_loopback_host(&host) {
                warn!(host = %host, "Refusing unencrypted realtime endpoint");
                return Err(UrlValidationError::SecureSchemeRequired(host.to_string()));
            }
        }
        other => {
            return Err(UrlValidationError::WebSocketSchemeRequired(
                other.to_string(),
            ));
        }
    }

    Ok(parsed)
}

/// Validates a public `host[:port]` for use in advertised WebSocket URLs.
pub fn validate_public_host(host: &str) -> Result<(), UrlValidationError> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::MissingHost);
    }
    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | '\\' | '"' | '<' | '>'))
    {
        return Err(UrlValidationError::InvalidHost(trimmed.to_string()));
    }

    let parsed = Url::parse(&format!("wss://{trimmed}/"))
        .map_err(|_| UrlValidationError::InvalidHost(trimmed.to_string()))?;
    if parsed.host().is_none() {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(())
}
