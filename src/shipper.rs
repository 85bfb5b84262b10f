//! Delivery orchestrator.
//!
//! Routes inbound records (direct S3 notifications or SQS-wrapped batches
//! of them) through the fetch → decompress → parse → batch → submit
//! pipeline, one object at a time, and folds per-record outcomes into the
//! partial-failure report when the invocation came from a queue.

use std::sync::Arc;

use chrono::DateTime;
use percent_encoding::percent_decode_str;
use tracing::{error, info, warn};

use crate::batcher::{Batcher, LogEvent};
use crate::config::ShipperConfig;
use crate::error::{ShipperError, ShipperResult};
use crate::event::{
    EventRecord, InvocationEvent, ItemFailure, PartialFailureResponse, S3EventEnvelope,
};
use crate::parser::LineParser;
use crate::schema::{schema_for, LogKind, TransformRegistry};
use crate::store::{decode_plaintext, gunzip, ObjectStore};
use crate::stream::{LogStreamStore, StreamSequencer};

/// Load balancers drop a sentinel object into the bucket when log
/// delivery is enabled; it carries no log lines.
const TEST_FILE_SUFFIX: &str = "TestFile";

/// Orchestrates one invocation's records through the shipping pipeline.
pub struct LogShipper {
    config: ShipperConfig,
    object_store: Arc<dyn ObjectStore>,
    stream_store: Arc<dyn LogStreamStore>,
}

impl LogShipper {
    pub fn new(
        config: ShipperConfig,
        object_store: Arc<dyn ObjectStore>,
        stream_store: Arc<dyn LogStreamStore>,
    ) -> Self {
        Self {
            config,
            object_store,
            stream_store,
        }
    }

    /// Process one invocation. Returns a partial-failure report when any
    /// record was queue-sourced, otherwise no output value.
    pub async fn handle(
        &self,
        event: InvocationEvent,
    ) -> ShipperResult<Option<PartialFailureResponse>> {
        if event.records.is_empty() {
            return Ok(None);
        }

        let mut failures: Option<Vec<ItemFailure>> = None;

        for record in &event.records {
            match record.event_source.as_deref() {
                Some("aws:s3") => {
                    // A failure aborts this notification only.
                    if let Err(err) = self.process_notification(record).await {
                        error!(error = %err, "failed to process object notification");
                    }
                }
                Some("aws:sqs") => {
                    let failures = failures.get_or_insert_with(Vec::new);
                    if let Some(item_identifier) = self.process_queue_record(record).await {
                        failures.push(ItemFailure { item_identifier });
                    }
                }
                other => {
                    warn!(event_source = ?other, "ignoring record from unknown event source");
                }
            }
        }

        info!("finished processing records");
        Ok(failures.map(|batch_item_failures| PartialFailureResponse {
            batch_item_failures,
        }))
    }

    /// Process one SQS message. Returns the message id to report as a
    /// failure when the body cannot be decoded or an inner notification's
    /// pipeline fails, so the queue redelivers exactly this message.
    async fn process_queue_record(&self, record: &EventRecord) -> Option<String> {
        let message_id = record.message_id.clone().unwrap_or_default();
        let body = record.body.as_deref().unwrap_or_default();

        let envelope: S3EventEnvelope = match serde_json::from_str(body) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(
                    message_id = %message_id,
                    error = %err,
                    "failed to decode queue message body"
                );
                return Some(message_id);
            }
        };

        let Some(notifications) = envelope.records else {
            warn!(message_id = %message_id, "no records found in queue message body");
            return None;
        };

        for notification in &notifications {
            if let Err(err) = self.process_notification(notification).await {
                error!(
                    message_id = %message_id,
                    error = %err,
                    "failed to process notification from queue message"
                );
                return Some(message_id);
            }
        }

        None
    }

    /// Run the full pipeline for one object notification.
    async fn process_notification(&self, record: &EventRecord) -> ShipperResult<()> {
        let s3 = record
            .s3
            .as_ref()
            .ok_or_else(|| ShipperError::malformed("no s3 entity found in record"))?;
        let bucket = s3
            .bucket
            .as_ref()
            .and_then(|b| b.name.as_deref())
            .ok_or_else(|| ShipperError::malformed("no bucket found in record"))?;
        let raw_key = s3
            .object
            .as_ref()
            .and_then(|o| o.key.as_deref())
            .ok_or_else(|| ShipperError::malformed("no key found in record"))?;
        let key = decode_key(raw_key)?;
        let event_name = record
            .event_name
            .as_deref()
            .ok_or_else(|| ShipperError::malformed("no event name found in record"))?;

        if !event_name.contains("ObjectCreated:") {
            info!(event_name, "ignoring non-creation event");
            return Ok(());
        }
        if key.ends_with(TEST_FILE_SUFFIX) {
            info!(key = %key, "ignoring test file");
            return Ok(());
        }

        let lb_type = self.config.load_balancer_type;
        let kind = LogKind::from_key(&key);
        let Some(schema) = schema_for(lb_type, kind) else {
            warn!(%lb_type, %kind, "no schema registered for log kind, skipping object");
            return Ok(());
        };
        let Some(time_index) = schema.time_index() else {
            warn!(%lb_type, %kind, "schema has no time field, skipping object");
            return Ok(());
        };

        info!(%lb_type, %kind, bucket, key = %key, "processing log object");

        let bytes = self.object_store.fetch(bucket, &key).await?;
        let text = if lb_type.compressed_delivery() {
            gunzip(&bytes)?
        } else {
            decode_plaintext(bytes)?
        };

        // The stream is named after the object key; resolve its write
        // token before any submission.
        let mut sequencer =
            StreamSequencer::resolve(self.stream_store.as_ref(), &self.config.log_group_name, &key)
                .await?;

        let registry = TransformRegistry::new(lb_type);
        let parser = LineParser::new(schema, &registry);

        // Deterministic submission order; timestamps are re-sorted per
        // batch by the sequencer.
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort_unstable();

        let mut batcher = Batcher::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            if let Some(event) = self.build_event(&parser, time_index, line) {
                batcher.push(event);
            }
        }

        info!(
            events = batcher.total_events(),
            bytes = batcher.total_bytes(),
            "finished batching log lines"
        );
        sequencer.submit_all(batcher.finish()).await;
        Ok(())
    }

    /// Parse and format one line. Returns `None` (dropping the line) when
    /// the time column is missing or unparseable.
    fn build_event(
        &self,
        parser: &LineParser<'_>,
        time_index: usize,
        line: &str,
    ) -> Option<LogEvent> {
        let Some(time_token) = line.split(' ').nth(time_index) else {
            warn!(line, "line too short for time field, dropping");
            return None;
        };
        let Some(timestamp) = parse_timestamp(time_token) else {
            warn!(time_token, "unparseable timestamp, dropping line");
            return None;
        };

        let message = if self.config.plaintext_logs {
            line.to_string()
        } else {
            let parsed = parser.parse(line);
            match serde_json::to_string(&parsed) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize parsed line, dropping");
                    return None;
                }
            }
        };

        Some(LogEvent::new(message, timestamp))
    }
}

/// URI-decode an object key, treating `+` as space first, the way object
/// notifications encode keys.
fn decode_key(raw: &str) -> ShipperResult<String> {
    let plus_decoded = raw.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .map_err(|e| ShipperError::malformed(format!("invalid key encoding: {}", e)))
}

/// Parse a log timestamp to epoch milliseconds. A value without a `Z`
/// suffix is treated as UTC.
fn parse_timestamp(token: &str) -> Option<i64> {
    let mut value = token.to_string();
    if !value.ends_with('Z') {
        value.push('Z');
    }
    DateTime::parse_from_rfc3339(&value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
