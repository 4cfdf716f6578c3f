//! Raw fetched message payload, as handed to the parser.
//!
//! The MIME tree is stored as an arena: `parts[0]` is the root payload and
//! every part lists its children by index. Sources build this from whatever
//! wire format they speak (Gmail API JSON, RFC 5322 bytes).

use serde::{Deserialize, Serialize};

/// A single `name: value` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How a part's `body` string must be decoded to recover its content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyEncoding {
    /// Already decoded text.
    #[default]
    Identity,
    /// Standard base64 (`Content-Transfer-Encoding: base64`).
    Base64,
    /// URL-safe base64, as the Gmail API delivers `body.data`.
    Base64Url,
    /// `Content-Transfer-Encoding: quoted-printable`.
    QuotedPrintable,
}

/// One node of the MIME tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    /// Declared content type, e.g. `"text/html"` (parameters allowed).
    pub mime_type: String,
    pub headers: Vec<Header>,
    /// Encoded body, if the part has one.
    pub body: Option<String>,
    pub encoding: BodyEncoding,
    /// Charset of the decoded bytes (`None` = UTF-8).
    pub charset: Option<String>,
    /// Arena indices of child parts, in declared order.
    pub children: Vec<usize>,
}

/// One fetched message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Opaque id assigned by the source.
    pub id: String,
    pub snippet: Option<String>,
    /// Internal timestamp in milliseconds since the Unix epoch.
    pub internal_date: Option<i64>,
    pub size_estimate: Option<u64>,
    pub label_ids: Vec<String>,
    /// MIME arena; index 0 is the root payload. Empty if the source sent no payload.
    pub parts: Vec<MessagePart>,
}

impl RawMessage {
    /// The root payload part, if any.
    pub fn root(&self) -> Option<&MessagePart> {
        self.parts.first()
    }

    /// Headers of the root payload (empty when there is no payload).
    pub fn headers(&self) -> &[Header] {
        self.root().map(|p| p.headers.as_slice()).unwrap_or(&[])
    }

    /// Build from a Gmail API `users.messages.get?format=full` response.
    pub fn from_gmail(msg: GmailMessage) -> Self {
        let mut parts = Vec::new();
        if let Some(payload) = msg.payload {
            push_gmail_part(&mut parts, payload);
        }

        Self {
            id: msg.id,
            snippet: msg.snippet,
            internal_date: msg.internal_date.and_then(EpochMillis::millis),
            size_estimate: msg.size_estimate,
            label_ids: msg.label_ids,
            parts,
        }
    }
}

/// Flatten a nested Gmail part into the arena, returning its index.
fn push_gmail_part(parts: &mut Vec<MessagePart>, src: GmailPart) -> usize {
    let idx = parts.len();
    let charset = src
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("content-type"))
        .and_then(|h| content_type_param(&h.value, "charset"));

    parts.push(MessagePart {
        mime_type: src.mime_type,
        headers: src
            .headers
            .into_iter()
            .map(|h| Header::new(h.name, h.value))
            .collect(),
        body: src.body.and_then(|b| b.data),
        encoding: BodyEncoding::Base64Url,
        charset,
        children: Vec::new(),
    });

    let children = src
        .parts
        .into_iter()
        .map(|child| push_gmail_part(parts, child))
        .collect();
    parts[idx].children = children;
    idx
}

/// Extract a parameter (e.g. `charset`) from a `Content-Type` value.
pub fn content_type_param(value: &str, param: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|kv| {
        let (k, v) = kv.split_once('=')?;
        if k.trim().eq_ignore_ascii_case(param) {
            Some(v.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

// ── Gmail API wire types ────────────────────────────────────────

/// Gmail API message resource (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub size_estimate: Option<u64>,
    #[serde(default)]
    pub internal_date: Option<EpochMillis>,
    #[serde(default)]
    pub payload: Option<GmailPart>,
}

/// Gmail API `MessagePart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailPart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<GmailHeader>,
    #[serde(default)]
    pub body: Option<GmailBody>,
    #[serde(default)]
    pub parts: Vec<GmailPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailBody {
    #[serde(default)]
    pub data: Option<String>,
}

/// `internalDate` arrives as a JSON string in the Gmail API, but exports
/// sometimes carry a plain number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EpochMillis {
    Number(i64),
    Text(String),
}

impl EpochMillis {
    pub fn millis(self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}
