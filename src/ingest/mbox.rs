//! MBOX file source (Gmail Takeout exports and any other `From `-separated file).
//!
//! The file is read once and split into message spans up front; the listing
//! pages over those spans and `fetch_full` hands one span to the RFC 5322
//! reader.
//!
//! Records take their id from `Message-ID`. Messages without one get
//! `mbox-<hash>`, built from a SHA-256 of the message bytes, so ids stay
//! distinct across files scanned into the same store.

use std::ops::Range;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::{MessageRef, MessageSource, Page};
use crate::error::{Result, SweepError};
use crate::model::raw::RawMessage;
use crate::parser::header::get_header;
use crate::parser::mime::raw_from_rfc822;

/// Reference-id prefix; the suffix is the message ordinal in the file.
const REF_PREFIX: &str = "mbox-";

/// Prefix of content-derived record ids.
const HASH_ID_PREFIX: &str = "mbox-";

/// Digest bytes kept in a content-derived id (hex-encoded).
const HASH_ID_BYTES: usize = 8;

/// Default number of references per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

pub struct MboxSource {
    path: PathBuf,
    data: Vec<u8>,
    spans: Vec<Range<usize>>,
    page_size: usize,
}

impl MboxSource {
    /// Read `path` and locate every message in it.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).map_err(|e| SweepError::io(&path, e))?;
        let spans = split_messages(&data);
        debug!(path = %path.display(), bytes = data.len(), messages = spans.len(), "Read MBOX");

        Ok(Self {
            path,
            data,
            spans,
            page_size: page_size.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of messages found in the file.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn message_bytes(&self, ordinal: usize) -> Option<&[u8]> {
        let span = self.spans.get(ordinal)?.clone();
        self.data.get(span)
    }
}

impl MessageSource for MboxSource {
    fn list_page(&mut self, cursor: Option<&str>) -> Result<Page> {
        let start = parse_cursor(cursor)?;
        let end = (start + self.page_size).min(self.spans.len());
        let refs = (start.min(end)..end)
            .map(|i| MessageRef::new(format!("{REF_PREFIX}{i}")))
            .collect();
        Ok(Page {
            refs,
            next_cursor: (end < self.spans.len()).then(|| end.to_string()),
        })
    }

    fn fetch_full(&mut self, reference: &MessageRef) -> Result<RawMessage> {
        let ordinal = reference
            .id
            .strip_prefix(REF_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| SweepError::fetch(&reference.id, "not an MBOX reference"))?;
        let bytes = self
            .message_bytes(ordinal)
            .ok_or_else(|| SweepError::fetch(&reference.id, "no such message in file"))?;

        let mut raw = raw_from_rfc822(&reference.id, bytes)
            .ok_or_else(|| SweepError::parse(&reference.id, "unreadable RFC 5322 message"))?;

        let message_id = raw
            .root()
            .map(|root| get_header(&root.headers, "Message-ID").trim().to_string())
            .unwrap_or_default();
        raw.id = if message_id.is_empty() {
            content_id(bytes)
        } else {
            message_id
        };
        Ok(raw)
    }
}

/// Record id for a message without `Message-ID`: `mbox-` plus a digest prefix.
fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest[..HASH_ID_BYTES]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    format!("{HASH_ID_PREFIX}{hex}")
}

fn parse_cursor(cursor: Option<&str>) -> Result<usize> {
    match cursor {
        None => Ok(0),
        Some(c) => c
            .parse()
            .map_err(|_| SweepError::fetch(c, "invalid MBOX listing cursor")),
    }
}

/// Byte ranges of the messages in an MBOX buffer.
///
/// A line starting with `From ` opens a new message when it is the first
/// `From ` line of the file or follows a blank line. Anything before the first
/// separator is ignored.
pub fn split_messages(data: &[u8]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;
    let mut prev_blank = true;

    while offset < data.len() {
        let line_end = data[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| offset + p + 1)
            .unwrap_or(data.len());
        let line = &data[offset..line_end];

        if is_mbox_separator(line) {
            if prev_blank || start.is_none() {
                if let Some(s) = start {
                    spans.push(s..offset);
                }
                start = Some(offset);
            } else {
                debug!(offset, "'From ' line without preceding blank line kept as body");
            }
        }

        prev_blank = is_blank_line(line);
        offset = line_end;
    }

    if let Some(s) = start {
        spans.push(s..data.len());
    }
    spans
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO: &[u8] = b"From a@example.com Thu Jan 01 00:00:00 2024\n\
Subject: one\n\
\n\
body one\n\
\n\
From b@example.com Thu Jan 01 00:00:00 2024\n\
Subject: two\n\
\n\
quoted line\n\
From here on, a body line that is not a separator\n";

    #[test]
    fn test_is_mbox_separator() {
        assert!(is_mbox_separator(b"From user@example.com Thu Jan 01 00:00:00 2024\n"));
        assert!(!is_mbox_separator(b"from user@example.com\n"));
        assert!(!is_mbox_separator(b">From user@example.com\n"));
        assert!(!is_mbox_separator(b"Subject: From here\n"));
    }

    #[test]
    fn test_split_requires_blank_line_for_body_from() {
        let spans = split_messages(TWO);
        assert_eq!(spans.len(), 2);
        assert!(TWO[spans[1].clone()].starts_with(b"From b@"));
        assert_eq!(spans[1].end, TWO.len());
    }

    #[test]
    fn test_split_empty_and_garbage() {
        assert!(split_messages(b"").is_empty());
        assert!(split_messages(b"no separator here\n").is_empty());
    }

    #[test]
    fn test_content_id_is_stable_and_distinct() {
        let a = content_id(b"Subject: one\n\nbody\n");
        assert_eq!(a, content_id(b"Subject: one\n\nbody\n"));
        assert_ne!(a, content_id(b"Subject: two\n\nbody\n"));
        assert!(a.starts_with("mbox-"));
        assert_eq!(a.len(), "mbox-".len() + 2 * HASH_ID_BYTES);
    }

    #[test]
    fn test_missing_message_id_uses_content_id() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), TWO).unwrap();
        let mut source = MboxSource::open(file.path(), 10).unwrap();

        let first = source.fetch_full(&MessageRef::new("mbox-0")).unwrap();
        let second = source.fetch_full(&MessageRef::new("mbox-1")).unwrap();
        assert!(first.id.starts_with("mbox-"));
        assert_ne!(first.id, "mbox-0");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_empty_file_has_no_messages() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut source = MboxSource::open(file.path(), 10).unwrap();
        assert!(source.is_empty());
        assert!(source.list_page(None).unwrap().refs.is_empty());
    }

    #[test]
    fn test_cursor_parsing() {
        assert_eq!(parse_cursor(None).unwrap(), 0);
        assert_eq!(parse_cursor(Some("200")).unwrap(), 200);
        assert!(matches!(parse_cursor(Some("x")), Err(SweepError::Fetch { .. })));
    }
}
