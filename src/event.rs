//! Inbound invocation event shapes and the partial-failure response.
//!
//! One invocation delivers a list of records. A record is either a direct
//! S3 object notification or an SQS message whose JSON body wraps a nested
//! list of S3 notifications. Every field is optional at the serde level;
//! the orchestrator decides what is required and what is merely ignorable.

use serde::{Deserialize, Serialize};

/// Top-level invocation payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

/// One top-level input record, S3- or SQS-sourced.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default)]
    pub event_source: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    /// SQS only: identifier reported on partial failure.
    #[serde(default)]
    pub message_id: Option<String>,
    /// SQS only: JSON-encoded nested S3 event.
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

/// Nested S3 event carried inside an SQS message body.
#[derive(Debug, Clone, Deserialize)]
pub struct S3EventEnvelope {
    #[serde(rename = "Records")]
    pub records: Option<Vec<EventRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: Option<BucketRef>,
    #[serde(default)]
    pub object: Option<ObjectRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub key: Option<String>,
}

/// Returned only when the invocation carried SQS records, so the queue
/// can redeliver exactly the failed messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialFailureResponse {
    pub batch_item_failures: Vec<ItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub item_identifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_s3_record() {
        let json = serde_json::json!({
            "Records": [{
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": "my-logs" },
                    "object": { "key": "AWSLogs/file.log.gz" }
                }
            }]
        });
        let event: InvocationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.records.len(), 1);
        let record = &event.records[0];
        assert_eq!(record.event_source.as_deref(), Some("aws:s3"));
        let s3 = record.s3.as_ref().unwrap();
        assert_eq!(
            s3.bucket.as_ref().unwrap().name.as_deref(),
            Some("my-logs")
        );
        assert_eq!(
            s3.object.as_ref().unwrap().key.as_deref(),
            Some("AWSLogs/file.log.gz")
        );
    }

    #[test]
    fn test_deserialize_sqs_record() {
        let json = serde_json::json!({
            "Records": [{
                "eventSource": "aws:sqs",
                "messageId": "msg-1",
                "body": "{\"Records\":[]}"
            }]
        });
        let event: InvocationEvent = serde_json::from_value(json).unwrap();
        let record = &event.records[0];
        assert_eq!(record.event_source.as_deref(), Some("aws:sqs"));
        let envelope: S3EventEnvelope =
            serde_json::from_str(record.body.as_deref().unwrap()).unwrap();
        assert_eq!(envelope.records.unwrap().len(), 0);
    }

    #[test]
    fn test_empty_event() {
        let event: InvocationEvent = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(event.records.is_empty());
    }

    #[test]
    fn test_partial_failure_serialization() {
        let response = PartialFailureResponse {
            batch_item_failures: vec![ItemFailure {
                item_identifier: "msg-1".to_string(),
            }],
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "batchItemFailures": [{ "itemIdentifier": "msg-1" }]
            })
        );
    }
}
