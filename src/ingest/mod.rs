//! Ingestion: paged retrieval from a [`MessageSource`], parsing, classification
//! and batched persistence, with progress reported as [`ScanEvent`]s.

pub mod json_dir;
pub mod mbox;
pub mod pipeline;

use std::fmt;

use crate::error::Result;
use crate::model::raw::RawMessage;

pub use json_dir::JsonDirSource;
pub use mbox::MboxSource;
pub use pipeline::{CancelToken, Pipeline, ScanHandle, ScanOptions, ScanReport};

/// Opaque handle to one message in a source listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub id: String,
}

impl MessageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub refs: Vec<MessageRef>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Where messages come from.
pub trait MessageSource {
    /// List one page of references, starting at `cursor` (`None` = first page).
    fn list_page(&mut self, cursor: Option<&str>) -> Result<Page>;

    /// Retrieve the full payload for one reference.
    fn fetch_full(&mut self, reference: &MessageRef) -> Result<RawMessage>;
}

/// Lifecycle notifications emitted by a scan.
///
/// The `Display` form is the human-readable status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Started,
    Listed { found: usize },
    Processed { current: usize, total: usize },
    Completed { saved: usize },
    Cancelled { saved: usize },
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "Fetching email list..."),
            Self::Listed { found } => write!(f, "Found {found} emails..."),
            Self::Processed { current, total } => write!(f, "Processing {current}/{total} emails..."),
            Self::Completed { saved } => write!(f, "Scan complete! Processed {saved} emails."),
            Self::Cancelled { saved } => write!(f, "Scan cancelled. Saved {saved} emails."),
        }
    }
}

/// Receives scan progress. Any `FnMut(&ScanEvent)` closure is a sink.
pub trait ProgressSink {
    fn report(&mut self, event: &ScanEvent);
}

impl<F: FnMut(&ScanEvent)> ProgressSink for F {
    fn report(&mut self, event: &ScanEvent) {
        self(event)
    }
}
