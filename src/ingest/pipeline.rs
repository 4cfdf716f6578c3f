//! The scan loop: list → fetch → parse → classify → flush.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use super::{MessageRef, MessageSource, ProgressSink, ScanEvent};
use crate::classify::Categorizer;
use crate::error::{Result, SweepError};
use crate::model::record::MessageRecord;
use crate::parser::{parse_message, ParsedMessage};
use crate::store::RecordStore;

/// Default cap on the number of messages listed per scan.
pub const DEFAULT_MAX_RESULTS: usize = 500;

/// Default number of records per store flush.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default number of messages between `Processed` events.
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// Tunables for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub max_results: usize,
    pub batch_size: usize,
    pub progress_every: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// Outcome counters of a finished (or cancelled) scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ScanReport {
    /// References returned by the listing, after truncation to `max_results`.
    pub listed: usize,
    /// Messages attempted (fetched, parsed and classified, or skipped).
    pub processed: usize,
    /// Messages skipped because fetching or parsing failed.
    pub skipped: usize,
    /// Records handed to the store.
    pub saved: usize,
    /// Number of `save_batch` calls.
    pub batches: usize,
    pub cancelled: bool,
}

/// Shared flag that asks a running scan to stop between messages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one source into one store.
pub struct Pipeline<S, R> {
    source: S,
    store: R,
    categorizer: Categorizer,
    options: ScanOptions,
    cancel: CancelToken,
}

impl<S: MessageSource, R: RecordStore> Pipeline<S, R> {
    pub fn new(source: S, store: R, categorizer: Categorizer, options: ScanOptions) -> Self {
        Self {
            source,
            store,
            categorizer,
            options,
            cancel: CancelToken::new(),
        }
    }

    /// A handle that cancels this pipeline's scans.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn into_parts(self) -> (S, R) {
        (self.source, self.store)
    }

    /// Run a full scan.
    ///
    /// Per-message fetch and parse failures are logged and skipped. A listing
    /// failure or a failed flush aborts the scan; batches flushed before the
    /// failure stay in the store. Any other error from the source (I/O,
    /// persistence) aborts too, after the records ingested so far are flushed.
    pub fn run(&mut self, progress: &mut dyn ProgressSink) -> Result<ScanReport> {
        let batch_size = self.options.batch_size.max(1);
        let progress_every = self.options.progress_every.max(1);

        progress.report(&ScanEvent::Started);
        let refs = self.collect_refs(progress)?;
        let total = refs.len();
        info!(total, "Listing complete");

        let mut report = ScanReport {
            listed: total,
            ..Default::default()
        };
        let mut pending: Vec<MessageRecord> = Vec::with_capacity(batch_size.min(total));

        for (i, reference) in refs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(processed = report.processed, "Scan cancelled");
                report.cancelled = true;
                break;
            }

            match self.ingest_one(reference) {
                Ok(record) => pending.push(record),
                Err(e) if e.is_per_message() => {
                    warn!(reference = %reference, error = %e, "Skipping message");
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(reference = %reference, error = %e, "Source failed, aborting scan");
                    if !pending.is_empty() {
                        self.flush(&mut pending, &mut report)?;
                    }
                    return Err(e);
                }
            }
            report.processed += 1;

            if pending.len() >= batch_size {
                self.flush(&mut pending, &mut report)?;
            }

            let current = i + 1;
            if current % progress_every == 0 || current == total {
                progress.report(&ScanEvent::Processed { current, total });
            }
        }

        if !pending.is_empty() {
            self.flush(&mut pending, &mut report)?;
        }

        if report.cancelled {
            progress.report(&ScanEvent::Cancelled { saved: report.saved });
        } else {
            progress.report(&ScanEvent::Completed { saved: report.saved });
        }
        info!(
            saved = report.saved,
            skipped = report.skipped,
            batches = report.batches,
            "Scan finished"
        );
        Ok(report)
    }

    /// Page through the listing until the cursor runs out or `max_results`
    /// references are collected.
    fn collect_refs(&mut self, progress: &mut dyn ProgressSink) -> Result<Vec<MessageRef>> {
        let max = self.options.max_results;
        let mut refs: Vec<MessageRef> = Vec::new();
        if max == 0 {
            progress.report(&ScanEvent::Listed { found: 0 });
            return Ok(refs);
        }

        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .source
                .list_page(cursor.as_deref())
                .map_err(|e| match e {
                    fetch @ SweepError::Fetch { .. } => fetch,
                    other => SweepError::fetch(cursor.as_deref().unwrap_or("<first page>"), other.to_string()),
                })?;
            debug!(page_len = page.refs.len(), "Listed page");
            refs.extend(page.refs);
            progress.report(&ScanEvent::Listed {
                found: refs.len().min(max),
            });

            match page.next_cursor {
                Some(next) if refs.len() < max => cursor = Some(next),
                _ => break,
            }
        }

        refs.truncate(max);
        Ok(refs)
    }

    fn ingest_one(&mut self, reference: &MessageRef) -> Result<MessageRecord> {
        let raw = self.source.fetch_full(reference)?;
        let ParsedMessage {
            mut record,
            html_body,
        } = parse_message(&raw)?;
        let html = Some(html_body.as_str()).filter(|b| !b.is_empty());
        record.category = Some(self.categorizer.classify(&record, html));
        Ok(record)
    }

    fn flush(&mut self, pending: &mut Vec<MessageRecord>, report: &mut ScanReport) -> Result<()> {
        let count = pending.len();
        self.store.save_batch(pending).map_err(|e| {
            error!(count, error = %e, "Batch flush failed");
            match e {
                SweepError::Persistence(_) => e,
                other => SweepError::Persistence(other.to_string()),
            }
        })?;
        debug!(count, "Flushed batch");
        report.saved += count;
        report.batches += 1;
        pending.clear();
        Ok(())
    }
}

impl<S, R> Pipeline<S, R>
where
    S: MessageSource + Send + 'static,
    R: RecordStore + Send + 'static,
{
    /// Run the scan on a worker thread, streaming events over a channel.
    pub fn spawn(mut self) -> ScanHandle<S, R> {
        let (tx, rx) = mpsc::channel();
        let cancel = self.cancel_token();
        let handle = thread::spawn(move || {
            let mut sink = |event: &ScanEvent| {
                // The receiver may be gone; the scan keeps going regardless.
                let _ = tx.send(event.clone());
            };
            let result = self.run(&mut sink);
            (self, result)
        });
        ScanHandle {
            events: rx,
            cancel,
            handle,
        }
    }
}

/// A scan running on a worker thread.
pub struct ScanHandle<S, R> {
    events: mpsc::Receiver<ScanEvent>,
    cancel: CancelToken,
    handle: JoinHandle<(Pipeline<S, R>, Result<ScanReport>)>,
}

impl<S, R> ScanHandle<S, R> {
    /// Progress events, in emission order. The channel closes when the scan ends.
    pub fn events(&self) -> &mpsc::Receiver<ScanEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker and take back the pipeline with the scan result.
    pub fn join(self) -> (Pipeline<S, R>, Result<ScanReport>) {
        match self.handle.join() {
            Ok(out) => out,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
