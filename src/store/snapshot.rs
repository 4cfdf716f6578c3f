//! File-backed record store.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ HEADER (128 bytes, fixed)            │
//! │  magic: [u8; 8] = b"INBXSWP\0"       │
//! │  version: u32                        │
//! │  flags: u32                          │
//! │  record_count: u64                   │
//! │  written_at: i64                     │
//! │  payload_sha256: [u8; 32]            │
//! │  (padding to 128 bytes)              │
//! ├──────────────────────────────────────┤
//! │ PAYLOAD (variable)                   │
//! │  bincode-serialized Vec<MessageRecord>│
//! └──────────────────────────────────────┘
//! ```

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{MemoryStore, RecordStore};
use crate::error::{Result, SweepError};
use crate::model::record::MessageRecord;

/// Magic bytes identifying a snapshot file.
pub const MAGIC: &[u8; 8] = b"INBXSWP\0";

/// Current snapshot format version.
pub const VERSION: u32 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 128;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotHeader {
    magic: [u8; 8],
    version: u32,
    flags: u32,
    record_count: u64,
    /// Unix timestamp (seconds) of the write.
    written_at: i64,
    payload_sha256: [u8; 32],
}

impl SnapshotHeader {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.magic != *MAGIC {
            return Err("Invalid magic bytes".into());
        }
        if self.version != VERSION {
            return Err(format!(
                "Incompatible version: expected {VERSION}, found {}",
                self.version
            ));
        }
        Ok(())
    }
}

/// A [`MemoryStore`] mirrored to a snapshot file after every mutation.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl SnapshotStore {
    /// Open the snapshot at `path`. A missing file is an empty store; the file
    /// is created on the first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let records = read_snapshot(&path)?;
            debug!(path = %path.display(), count = records.len(), "Loaded snapshot");
            MemoryStore::from_records(records)
        } else {
            MemoryStore::new()
        };
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the in-memory view.
    pub fn records(&self) -> &[MessageRecord] {
        self.inner.records()
    }

    /// Apply `mutate` to a copy of the state, persist the copy, then commit it.
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut MemoryStore) -> T) -> Result<T> {
        let mut next = self.inner.clone();
        let out = mutate(&mut next);
        write_snapshot(&self.path, next.records())?;
        self.inner = next;
        Ok(out)
    }
}

impl RecordStore for SnapshotStore {
    fn save_batch(&mut self, records: &[MessageRecord]) -> Result<()> {
        self.commit(|store| store.upsert_all(records))
    }

    fn query_all(&self) -> Result<Vec<MessageRecord>> {
        self.inner.query_all()
    }

    fn query_by_sender(&self, address: &str) -> Result<Vec<MessageRecord>> {
        self.inner.query_by_sender(address)
    }

    fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize> {
        if !ids.iter().any(|id| self.inner.get(id).is_some()) {
            return Ok(0);
        }
        self.commit(|store| store.remove_all(ids))
    }
}

/// Read and validate a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<Vec<MessageRecord>> {
    let data = std::fs::read(path).map_err(|e| SweepError::io(path, e))?;
    let invalid = |reason: String| SweepError::InvalidSnapshot {
        path: path.to_path_buf(),
        reason,
    };

    if data.len() < HEADER_SIZE {
        return Err(invalid("File too small".into()));
    }

    let header: SnapshotHeader = bincode::deserialize(&data[..HEADER_SIZE])
        .map_err(|e| invalid(format!("Header deserialization failed: {e}")))?;
    header.validate().map_err(invalid)?;

    let payload = &data[HEADER_SIZE..];
    if sha256(payload) != header.payload_sha256 {
        return Err(invalid("Payload checksum mismatch".into()));
    }

    let records: Vec<MessageRecord> = bincode::deserialize(payload)
        .map_err(|e| invalid(format!("Payload deserialization failed: {e}")))?;

    if records.len() as u64 != header.record_count {
        return Err(invalid(format!(
            "Record count mismatch: header says {}, payload has {}",
            header.record_count,
            records.len()
        )));
    }

    Ok(records)
}

/// Write a snapshot next to `path` and atomically rename it into place.
pub fn write_snapshot(path: &Path, records: &[MessageRecord]) -> Result<()> {
    let payload = bincode::serialize(records)
        .map_err(|e| SweepError::Persistence(format!("Cannot encode snapshot: {e}")))?;

    let header = SnapshotHeader {
        magic: *MAGIC,
        version: VERSION,
        flags: 0,
        record_count: records.len() as u64,
        written_at: chrono::Utc::now().timestamp(),
        payload_sha256: sha256(&payload),
    };
    let header_bytes = bincode::serialize(&header)
        .map_err(|e| SweepError::Persistence(format!("Cannot encode snapshot header: {e}")))?;

    // Pad header to HEADER_SIZE
    let mut padded_header = vec![0u8; HEADER_SIZE];
    let copy_len = header_bytes.len().min(HEADER_SIZE);
    padded_header[..copy_len].copy_from_slice(&header_bytes[..copy_len]);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SweepError::io(parent, e))?;
    }

    let tmp_path = temp_path_for(path);
    write_file(&tmp_path, &padded_header, &payload)?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        SweepError::io(path, e)
    })?;

    info!(path = %path.display(), count = records.len(), "Snapshot written");
    Ok(())
}

fn write_file(path: &Path, header: &[u8], payload: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| SweepError::io(path, e))?;
    file.write_all(header).map_err(|e| SweepError::io(path, e))?;
    file.write_all(payload).map_err(|e| SweepError::io(path, e))?;
    file.sync_all().map_err(|e| SweepError::io(path, e))?;
    Ok(())
}

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hidden sibling used while writing.
///
/// Example: `/data/records.snap` → `/data/.records.snap.tmp`
fn temp_path_for(path: &Path) -> PathBuf {
    let filename = path.file_name().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!(".{filename}.tmp"))
}
