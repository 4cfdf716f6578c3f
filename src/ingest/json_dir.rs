//! Directory of Gmail API `messages.get?format=full` JSON dumps, one message
//! per `*.json` file.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{MessageRef, MessageSource, Page};
use crate::error::{Result, SweepError};
use crate::model::raw::{GmailMessage, RawMessage};

pub struct JsonDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    page_size: usize,
}

impl JsonDirSource {
    /// Collect the `*.json` files of `dir`, sorted by file name.
    pub fn open(dir: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir).map_err(|e| SweepError::io(&dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SweepError::io(&dir, e))?.path();
            let is_json = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        debug!(dir = %dir.display(), files = files.len(), "Found JSON messages");

        Ok(Self {
            dir,
            files,
            page_size: page_size.max(1),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl MessageSource for JsonDirSource {
    fn list_page(&mut self, cursor: Option<&str>) -> Result<Page> {
        let start = match cursor {
            None => 0,
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| SweepError::fetch(c, "invalid listing cursor"))?,
        };
        let end = (start + self.page_size).min(self.files.len());
        let refs = self.files[start.min(end)..end]
            .iter()
            .map(|p| MessageRef::new(p.to_string_lossy()))
            .collect();
        Ok(Page {
            refs,
            next_cursor: (end < self.files.len()).then(|| end.to_string()),
        })
    }

    fn fetch_full(&mut self, reference: &MessageRef) -> Result<RawMessage> {
        let data = std::fs::read(&reference.id)
            .map_err(|e| SweepError::fetch(&reference.id, e.to_string()))?;
        let message: GmailMessage = serde_json::from_slice(&data)
            .map_err(|e| SweepError::parse(&reference.id, format!("invalid message JSON: {e}")))?;
        Ok(RawMessage::from_gmail(message))
    }
}
