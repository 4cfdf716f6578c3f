//! Header access and decoding: case-insensitive lookup, RFC 2047 encoded words,
//! and timestamp conversion.

use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::warn;

use crate::model::raw::Header;

/// Get the first value for a header name (case-insensitive).
///
/// A missing header is an empty string, never an error.
pub fn get_header<'a>(headers: &'a [Header], name: &str) -> &'a str {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
        .unwrap_or("")
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Tokens that fail to decode are kept as-is.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two adjacent encoded words is dropped (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];
        match decode_one_word(after_start) {
            Some((text, consumed)) => {
                result.push_str(&text);
                remaining = &after_start[consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// Decode `charset?encoding?text?=`; returns the text and the bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let (charset, rest) = s.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let encoded = &rest[..end];
    let consumed = charset.len() + 1 + encoding.len() + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => super::mime::decode_base64(encoded, false).ok()?,
        "Q" | "q" => decode_quoted_printable(&encoded.replace('_', " ")),
        _ => return None,
    };

    Some((decode_charset(Some(charset), &bytes), consumed))
}

/// Decode quoted-printable text: `=XX` → byte, soft line breaks (`=\r\n`) removed.
pub fn decode_quoted_printable(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }
        match (bytes.get(i + 1), bytes.get(i + 2)) {
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (Some(&h), Some(&l)) if h.is_ascii_hexdigit() && l.is_ascii_hexdigit() => {
                let hex = [h, l];
                let byte = std::str::from_utf8(&hex)
                    .ok()
                    .and_then(|s| u8::from_str_radix(s, 16).ok())
                    .unwrap_or(b'?');
                result.push(byte);
                i += 3;
            }
            _ => {
                result.push(b'=');
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset (`None` or unknown ⇒ lossy UTF-8).
pub fn decode_charset(charset: Option<&str>, bytes: &[u8]) -> String {
    let Some(label) = charset.map(str::trim).filter(|c| !c.is_empty()) else {
        return String::from_utf8_lossy(bytes).into_owned();
    };
    if label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8") {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => {
            warn!(charset = label, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Convert an internal epoch-millisecond timestamp to local time.
pub fn local_timestamp(millis: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(millis).single()
}

/// Parse an RFC 2822 / RFC 3339 `Date:` header, falling back to `mail-parser`'s
/// lenient parser for the many broken real-world variants.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let fake_msg = format!("Date: {trimmed}\n\n");
    let parsed = mail_parser::MessageParser::default().parse(fake_msg.as_bytes());
    let from_parser = parsed
        .and_then(|m| m.date().map(|d| d.to_rfc3339()))
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc));
    if from_parser.is_none() {
        warn!(date = trimmed, "Could not parse date");
    }
    from_parser
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_header_case_insensitive() {
        let headers = vec![
            Header::new("From", "a@b.com"),
            Header::new("LIST-UNSUBSCRIBE", "<https://x.example/u>"),
        ];
        assert_eq!(get_header(&headers, "from"), "a@b.com");
        assert_eq!(get_header(&headers, "List-Unsubscribe"), "<https://x.example/u>");
        assert_eq!(get_header(&headers, "Subject"), "");
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_unpadded_base64_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYQ?="), "Hola");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_decode_adjacent_words_drop_whitespace() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?Q?Caf=C3=A9_hoy?= please";
        assert_eq!(decode_encoded_words(input), "Re: Café hoy please");
    }

    #[test]
    fn test_decode_invalid_word_passthrough() {
        assert_eq!(decode_encoded_words("50% =?off"), "50% =?off");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let decoded = decode_quoted_printable("Hello=\r\n World=3D=41");
        assert_eq!(decoded, b"Hello World=A");
    }

    #[test]
    fn test_decode_windows1252_charset() {
        assert_eq!(decode_charset(Some("Windows-1252"), &[0x4d, 0xfc]), "Mü");
    }

    #[test]
    fn test_local_timestamp() {
        let dt = local_timestamp(1_700_000_000_000).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-04");
    }

    #[test]
    fn test_parse_date_iso8601() {
        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
        assert!(parse_date("").is_none());
    }
}
