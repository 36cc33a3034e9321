//! Opening handshake negotiation (RFC 6455 Section 4).
//!
//! The negotiator is one-shot and stateless: it validates the upgrade
//! headers of a parsed request and computes the accept token. The caller
//! answers with `101 Switching Protocols` and hands the transport to a
//! [`Connection`](crate::Connection), or answers `400 Bad Request` and drops
//! the transport. A malformed handshake is fatal to that attempt only.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// GUID appended to the client key in the accept computation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Accept token: base64(SHA-1(key + GUID)).
///
/// # Example
///
/// ```
/// use wsframed::protocol::handshake::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Read-only projection of the upgrade-relevant request headers.
///
/// Derived from the parsed HTTP request; absent headers stay `None` so that
/// [`UpgradeRequest::negotiate`] can report which rule failed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpgradeRequest {
    /// `Upgrade` header value.
    pub upgrade: Option<String>,
    /// `Connection` header value.
    pub connection: Option<String>,
    /// `Sec-WebSocket-Key` header value.
    pub key: Option<String>,
    /// `Sec-WebSocket-Version` header value.
    pub version: Option<String>,
}

impl UpgradeRequest {
    /// Project the relevant fields out of a parsed header map with
    /// lowercase keys.
    #[must_use]
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        Self {
            upgrade: headers.get("upgrade").cloned(),
            connection: headers.get("connection").cloned(),
            key: headers.get("sec-websocket-key").cloned(),
            version: headers.get("sec-websocket-version").cloned(),
        }
    }

    /// Parse the request head of an HTTP upgrade attempt.
    ///
    /// Minimal by design: request line plus `name: value` header lines up to
    /// the blank line. Anything beyond what the upgrade needs is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Handshake` if the head is not UTF-8, the request line
    /// is malformed, or the method is not `GET`.
    pub fn parse(head: &[u8]) -> Result<Self> {
        let text =
            std::str::from_utf8(head).map_err(|_| Error::Handshake("invalid UTF-8".into()))?;
        let mut lines = text.lines();

        let request_line = lines
            .next()
            .ok_or_else(|| Error::Handshake("empty request".into()))?;
        let mut parts = request_line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("GET"), Some(_path), Some(version)) if version.starts_with("HTTP/1.1") => {}
            _ => {
                return Err(Error::Handshake(format!(
                    "malformed request line: {request_line}"
                )));
            }
        }

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        Ok(Self::from_headers(&headers))
    }

    /// Validate the upgrade headers and compute the accept token.
    ///
    /// All four rules are mandatory:
    /// - `Upgrade` equals `websocket` (case-insensitive)
    /// - `Connection`, split on commas, contains an `upgrade` token in any
    ///   position (case-insensitive)
    /// - `Sec-WebSocket-Key` present and non-empty
    /// - `Sec-WebSocket-Version` exactly `13`
    ///
    /// # Errors
    ///
    /// Returns `Error::Handshake` naming the first failed rule.
    pub fn negotiate(&self) -> Result<String> {
        match self.upgrade.as_deref() {
            Some(upgrade) if upgrade.eq_ignore_ascii_case("websocket") => {}
            Some(upgrade) => {
                return Err(Error::Handshake(format!("Upgrade header is {upgrade:?}")));
            }
            None => return Err(Error::Handshake("missing Upgrade header".into())),
        }

        let has_upgrade_token = self
            .connection
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
        if !has_upgrade_token {
            return Err(Error::Handshake(
                "Connection header lacks an upgrade token".into(),
            ));
        }

        let key = match self.key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(Error::Handshake("missing Sec-WebSocket-Key".into())),
        };

        if self.version.as_deref() != Some("13") {
            return Err(Error::Handshake(format!(
                "unsupported Sec-WebSocket-Version: {:?}",
                self.version
            )));
        }

        Ok(compute_accept_key(key))
    }
}

/// The `101 Switching Protocols` response carrying the accept token.
#[must_use]
pub fn accept_response(accept: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\
         \r\n"
    )
    .into_bytes()
}

/// The `400 Bad Request` response sent before dropping a rejected attempt.
#[must_use]
pub fn rejection_response() -> Vec<u8> {
    b"HTTP/1.1 400 Bad Request\r\n\r\n".to_vec()
}
