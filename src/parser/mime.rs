//! MIME handling: arena traversal, transfer decoding, RFC 5322 ingestion and
//! HTML text helpers.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use mail_parser::{MessageParser, MimeHeaders, PartType};
use tracing::debug;

use super::header::{decode_charset, decode_quoted_printable, parse_date};
use crate::model::raw::{BodyEncoding, Header, MessagePart, RawMessage};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Maximum snippet length (in characters) synthesized for RFC 5322 messages.
const SNIPPET_CHARS: usize = 200;

/// Line width handed to `html2text` when rendering HTML as text.
const HTML_TEXT_WIDTH: usize = 400;

/// Decode base64 (standard or URL-safe), ignoring embedded whitespace and padding.
pub fn decode_base64(data: &str, url_safe: bool) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if url_safe {
        URL_SAFE_LENIENT.decode(compact)
    } else {
        STANDARD_LENIENT.decode(compact)
    }
}

/// Decode a part's body from its transfer encoding into text.
///
/// A part without a body decodes to an empty string.
pub fn decode_part_body(part: &MessagePart) -> Result<String, String> {
    let Some(data) = part.body.as_deref() else {
        return Ok(String::new());
    };
    let bytes = match part.encoding {
        BodyEncoding::Identity => return Ok(data.to_string()),
        BodyEncoding::Base64 => decode_base64(data, false).map_err(|e| e.to_string())?,
        BodyEncoding::Base64Url => decode_base64(data, true).map_err(|e| e.to_string())?,
        BodyEncoding::QuotedPrintable => decode_quoted_printable(data),
    };
    Ok(decode_charset(part.charset.as_deref(), &bytes))
}

/// The `type/subtype` part of a content type, lowercased and without parameters.
pub fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Depth-first search for the first `text/html` part with a non-empty body.
///
/// Children are visited in declared order. Parts that fail to decode, child
/// indices that point outside the arena and cycles are skipped. Returns an
/// empty string when no HTML body exists.
pub fn find_html_body(raw: &RawMessage) -> String {
    if raw.parts.is_empty() {
        return String::new();
    }

    let mut visited = vec![false; raw.parts.len()];
    let mut stack = vec![0usize];

    while let Some(idx) = stack.pop() {
        let Some(part) = raw.parts.get(idx) else {
            debug!(id = %raw.id, index = idx, "Skipping dangling MIME part index");
            continue;
        };
        if std::mem::replace(&mut visited[idx], true) {
            debug!(id = %raw.id, index = idx, "Skipping already visited MIME part");
            continue;
        }

        if mime_essence(&part.mime_type) == "text/html" {
            match decode_part_body(part) {
                Ok(text) if !text.is_empty() => return text,
                Ok(_) => {}
                Err(reason) => {
                    debug!(id = %raw.id, index = idx, reason = %reason, "Skipping undecodable HTML part");
                }
            }
        }

        stack.extend(part.children.iter().rev().copied());
    }

    String::new()
}

/// Build a [`RawMessage`] from RFC 5322 bytes (an `.eml` file or one MBOX entry).
///
/// The leading MBOX `From ` line is ignored. Returns `None` when `mail-parser`
/// cannot make sense of the bytes at all.
pub fn raw_from_rfc822(id: &str, data: &[u8]) -> Option<RawMessage> {
    let message_bytes = skip_from_line(data);
    let msg = MessageParser::default().parse(message_bytes)?;
    let root_headers = unfold_headers(&String::from_utf8_lossy(header_block(message_bytes)));

    let mut parts: Vec<MessagePart> = msg
        .parts
        .iter()
        .map(|p| {
            let mime_type = p
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| match &p.body {
                    PartType::Html(_) => "text/html".to_string(),
                    _ => "text/plain".to_string(),
                });
            let (body, children) = match &p.body {
                PartType::Text(text) | PartType::Html(text) => (Some(text.to_string()), Vec::new()),
                PartType::Multipart(ids) => (None, ids.iter().map(|&i| i as usize).collect()),
                _ => (None, Vec::new()),
            };
            MessagePart {
                headers: vec![Header::new("Content-Type", mime_type.clone())],
                mime_type,
                body,
                encoding: BodyEncoding::Identity,
                charset: None,
                children,
            }
        })
        .collect();

    if let Some(root) = parts.first_mut() {
        root.headers = root_headers;
    }

    let get = |name: &str| {
        parts
            .first()
            .map(|p| super::header::get_header(&p.headers, name).to_string())
            .unwrap_or_default()
    };

    let label_ids: Vec<String> = get("X-Gmail-Labels")
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            if l.eq_ignore_ascii_case("unread") {
                "UNREAD".to_string()
            } else {
                l.to_string()
            }
        })
        .collect();

    let internal_date = parse_date(&get("Date")).map(|d| d.timestamp_millis());

    let snippet = msg
        .body_text(0)
        .map(|t| make_snippet(&t))
        .filter(|s| !s.is_empty());

    Some(RawMessage {
        id: id.to_string(),
        snippet,
        internal_date,
        size_estimate: Some(message_bytes.len() as u64),
        label_ids,
        parts,
    })
}

/// Collapse whitespace and cut to a short preview.
fn make_snippet(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(SNIPPET_CHARS)
        .collect()
}

/// Skip the `From ` separator line at the start of MBOX messages.
pub fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Everything before the first blank line.
fn header_block(data: &[u8]) -> &[u8] {
    let lf = data.windows(2).position(|w| w == b"\n\n");
    let crlf = data.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) => &data[..a.min(b)],
        (Some(a), None) | (None, Some(a)) => &data[..a],
        (None, None) => data,
    }
}

/// Unfold headers: continuation lines (leading space or tab) join the previous header.
fn unfold_headers(text: &str) -> Vec<Header> {
    let mut result: Vec<Header> = Vec::new();
    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.value.push(' ');
                last.value.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            result.push(Header::new(name.trim(), value.trim()));
        }
    }
    result
}

/// Visible text of an HTML fragment, with whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    html2text::from_read(html.as_bytes(), HTML_TEXT_WIDTH)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Entity-decoded value of an HTML attribute (`&amp;` becomes `&`).
pub fn decode_attribute(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    // Wide enough that the value never wraps.
    html2text::from_read(value.as_bytes(), value.len() + HTML_TEXT_WIDTH)
        .lines()
        .map(str::trim)
        .collect()
}
