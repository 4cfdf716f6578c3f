//! Raw payload → [`MessageRecord`].

use crate::error::{Result, SweepError};
use crate::model::address::Sender;
use crate::model::raw::RawMessage;
use crate::model::record::MessageRecord;

use super::header::{decode_encoded_words, get_header, local_timestamp};
use super::mime::find_html_body;
use super::unsubscribe::detect_unsubscribe;

/// Label id the source uses to mark unread messages.
pub const UNREAD_LABEL: &str = "UNREAD";

/// A parsed record together with the HTML body the categorizer may inspect.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    /// The structured record; `category` is still `None`.
    pub record: MessageRecord,
    /// First non-empty `text/html` body, or empty.
    pub html_body: String,
}

/// Parse one fetched message.
///
/// Missing headers, a missing payload and malformed MIME parts all degrade to
/// empty values. Only a message without an id is rejected, since the id is the
/// record's key.
pub fn parse_message(raw: &RawMessage) -> Result<ParsedMessage> {
    if raw.id.trim().is_empty() {
        return Err(SweepError::parse("<missing>", "message has no id"));
    }

    let headers = raw.headers();
    let from = Sender::parse(&decode_encoded_words(get_header(headers, "From")));
    let subject = decode_encoded_words(get_header(headers, "Subject"));
    let message_id = Some(get_header(headers, "Message-ID").trim())
        .filter(|v| !v.is_empty())
        .map(String::from);

    let html_body = find_html_body(raw);
    let unsubscribe_url = detect_unsubscribe(get_header(headers, "List-Unsubscribe"), &html_body);

    let record = MessageRecord {
        id: raw.id.clone(),
        message_id,
        from,
        subject,
        snippet: raw.snippet.clone().unwrap_or_default(),
        date: raw.internal_date.and_then(local_timestamp),
        size_bytes: raw.size_estimate.unwrap_or(0),
        category: None,
        unsubscribe_url,
        is_read: !raw.label_ids.iter().any(|l| l == UNREAD_LABEL),
        labels: raw.label_ids.clone(),
    };

    Ok(ParsedMessage { record, html_body })
}
