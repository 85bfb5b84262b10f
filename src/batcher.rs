//! Size- and count-bounded batching of formatted log events.
//!
//! CloudWatch Logs caps one PutLogEvents call at 1 MB of payload and
//! 10,000 events, where each event is charged its serialized length plus
//! a fixed 26-byte overhead. The batcher seals the open batch before an
//! insert that would cross either bound, so arrival order is preserved
//! and no sealed batch ever exceeds a cap.

use serde::Serialize;
use tracing::debug;

/// Maximum cumulative payload bytes per batch.
pub const MAX_BATCH_BYTES: usize = 1_000_000;

/// Maximum number of events per batch.
pub const MAX_BATCH_EVENTS: usize = 10_000;

/// Fixed per-event transport overhead charged against the byte cap.
pub const EVENT_OVERHEAD_BYTES: usize = 26;

/// One formatted log event awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub message: String,
    /// Epoch milliseconds, UTC.
    pub timestamp: i64,
}

impl LogEvent {
    pub fn new(message: String, timestamp: i64) -> Self {
        Self { message, timestamp }
    }

    /// Bytes this event contributes to a batch: serialized length plus
    /// the per-event overhead.
    pub fn encoded_size(&self) -> usize {
        let serialized = serde_json::to_string(self).map_or(self.message.len(), |s| s.len());
        serialized + EVENT_OVERHEAD_BYTES
    }
}

/// Accumulates events into an ordered list of sealed batches.
#[derive(Debug, Default)]
pub struct Batcher {
    batches: Vec<Vec<LogEvent>>,
    open: Vec<LogEvent>,
    open_bytes: usize,
    total_bytes: usize,
    total_events: usize,
}

impl Batcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, sealing the open batch first if the insert would
    /// cross the byte cap or the batch is already at the event cap.
    pub fn push(&mut self, event: LogEvent) {
        let size = event.encoded_size();
        if self.open_bytes + size >= MAX_BATCH_BYTES || self.open.len() >= MAX_BATCH_EVENTS {
            self.seal();
        }
        self.open_bytes += size;
        self.total_bytes += size;
        self.total_events += 1;
        self.open.push(event);
    }

    fn seal(&mut self) {
        debug!(
            bytes = self.open_bytes,
            events = self.open.len(),
            "sealed batch"
        );
        self.batches.push(std::mem::take(&mut self.open));
        self.open_bytes = 0;
    }

    /// Total bytes accumulated across all batches.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Total events accumulated across all batches.
    pub fn total_events(&self) -> usize {
        self.total_events
    }

    /// Close the stream: the last open batch joins the list even when
    /// empty, and the ordered batch list is returned.
    pub fn finish(mut self) -> Vec<Vec<LogEvent>> {
        self.batches.push(self.open);
        self.batches
    }
}
