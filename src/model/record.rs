//! The canonical parsed unit and its classification label.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};

use super::address::Sender;

/// Mailbox-hygiene category assigned by the categorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Promotional,
    Newsletter,
    Social,
    Automated,
    Spam,
    Important,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 6] = [
        Category::Promotional,
        Category::Newsletter,
        Category::Social,
        Category::Automated,
        Category::Spam,
        Category::Important,
    ];

    /// Upper-case label, e.g. `"PROMOTIONAL"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Promotional => "PROMOTIONAL",
            Self::Newsletter => "NEWSLETTER",
            Self::Social => "SOCIAL",
            Self::Automated => "AUTOMATED",
            Self::Spam => "SPAM",
            Self::Important => "IMPORTANT",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// Structured representation of one ingested email.
///
/// `id` is the unique key: stores upsert on it, so re-ingesting a message
/// replaces the previous record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MessageRecord {
    /// Opaque id assigned by the source system.
    pub id: String,

    /// The `Message-ID` header value, if present.
    pub message_id: Option<String>,

    /// Sender identity from the `From:` header.
    pub from: Sender,

    /// Decoded subject line (may be empty).
    pub subject: String,

    /// Short preview text (may be empty).
    pub snippet: String,

    /// Message timestamp in local time, when the source provided one.
    pub date: Option<DateTime<Local>>,

    /// Size in bytes as reported by the source.
    pub size_bytes: u64,

    /// Assigned category; `None` until classified.
    pub category: Option<Category>,

    /// Unsubscribe URL detected in headers or body.
    pub unsubscribe_url: Option<String>,

    /// Whether the message has been read.
    pub is_read: bool,

    /// Raw label ids from the source, used only as classification hints.
    pub labels: Vec<String>,
}

impl MessageRecord {
    /// Create an empty, unclassified record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_id: None,
            from: Sender::default(),
            subject: String::new(),
            snippet: String::new(),
            date: None,
            size_bytes: 0,
            category: None,
            unsubscribe_url: None,
            is_read: false,
            labels: Vec::new(),
        }
    }

    /// `true` when an unsubscribe link was detected.
    pub fn has_unsubscribe(&self) -> bool {
        self.unsubscribe_url.is_some()
    }
}
