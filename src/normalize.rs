//! Message normalization: headers and decoded bodies into records

use crate::error::{Error, Result};
use crate::resolve::{BodyResolution, FetchedBody, ResolutionStatus};
use crate::structure::PartDescriptor;
use mail_parser::{Addr, HeaderValue, MessageParser};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::warn;

pub const NO_SUBJECT: &str = "(no subject)";
pub const UNKNOWN_SENDER: &str = "(unknown sender)";
/// Body text used when fetched content cannot be decoded.
pub const DECODE_FAILED: &str = "[Unable to decode message body]";

/// One message as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub uid: u32,
    pub message_id: Option<String>,
    pub subject: String,
    pub from: String,
    /// RFC 3339 timestamp.
    pub date: String,
    pub body_text: String,
    pub body_html: String,
}

/// Header fields of a message, keyed by lowercased name. Repeated
/// headers keep every occurrence in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap(BTreeMap<String, Vec<String>>);

impl HeaderMap {
    /// Parse a raw RFC 5322 header block. A blank block yields an
    /// empty map, so every field falls back to its default.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let message = MessageParser::default()
            .parse_headers(raw)
            .ok_or_else(|| Error::Item("Unparseable header block".into()))?;

        let mut map = Self::default();
        for header in message.headers() {
            if let Some(value) = header_text(header.value()) {
                map.insert(header.name(), value);
            }
        }
        Ok(map)
    }

    pub fn insert(&mut self, name: &str, value: String) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value);
    }

    /// The first occurrence of a header.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

fn header_text(value: &HeaderValue<'_>) -> Option<String> {
    let text = match value {
        HeaderValue::Text(text) => Some(text.to_string()),
        HeaderValue::TextList(list) => Some(list.join(", ")),
        HeaderValue::DateTime(dt) => Some(dt.to_rfc3339()),
        HeaderValue::Address(address) => address.first().map(format_addr),
        _ => None,
    };
    text.filter(|s| !s.trim().is_empty())
}

fn format_addr(addr: &Addr<'_>) -> String {
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) => format!("{name} <{address}>"),
        (None, Some(address)) => address.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => String::new(),
    }
}

/// Decoded renderings of a body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub html: String,
}

/// Decode raw part content using what the structure said about it.
///
/// The part is wrapped in a minimal MIME entity carrying its content
/// type, charset, and transfer encoding, then handed to `mail-parser`.
/// A missing HTML rendering is derived from the text and vice versa.
pub fn decode_body(raw: &[u8], descriptor: &PartDescriptor) -> Result<DecodedBody> {
    let mut entity = format!("Content-Type: {}", descriptor.mime_type());
    if let Some(charset) = &descriptor.charset {
        entity.push_str(&format!("; charset=\"{charset}\""));
    }
    entity.push_str("\r\n");
    if let Some(encoding) = descriptor
        .encoding
        .as_deref()
        .filter(|e| matches!(*e, "base64" | "quoted-printable"))
    {
        entity.push_str(&format!("Content-Transfer-Encoding: {encoding}\r\n"));
    }
    entity.push_str("\r\n");

    let mut bytes = entity.into_bytes();
    bytes.extend_from_slice(raw);

    let message = MessageParser::default()
        .parse(&bytes)
        .ok_or_else(|| Error::Decode("MIME parser rejected the part".into()))?;

    let text = message.body_text(0).map(Cow::into_owned);
    let html = message.body_html(0).map(Cow::into_owned);
    if text.is_none() && html.is_none() {
        return Err(Error::Decode(format!(
            "No displayable {} content",
            descriptor.mime_type()
        )));
    }

    Ok(DecodedBody {
        text: text.unwrap_or_default(),
        html: html.unwrap_or_default(),
    })
}

/// Build the output record for one message.
#[must_use]
pub fn normalize(uid: u32, headers: &HeaderMap, resolution: &BodyResolution) -> MessageRecord {
    let (body_text, body_html) = match (&resolution.content, resolution.status) {
        (Some(FetchedBody { raw, descriptor }), _) => match decode_body(raw, descriptor) {
            Ok(decoded) => (decoded.text, decoded.html),
            Err(e) => {
                warn!(uid, "Failed to decode body: {}", e);
                (DECODE_FAILED.to_string(), String::new())
            }
        },
        (None, status) => (
            status.note().map(str::to_string).unwrap_or_default(),
            String::new(),
        ),
    };

    MessageRecord {
        uid,
        message_id: headers.first("message-id").map(str::to_string),
        subject: headers.first("subject").unwrap_or(NO_SUBJECT).to_string(),
        from: headers.first("from").unwrap_or(UNKNOWN_SENDER).to_string(),
        date: headers
            .first("date")
            .map_or_else(|| chrono::Utc::now().to_rfc3339(), str::to_string),
        body_text,
        body_html,
    }
}
