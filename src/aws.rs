//! AWS-backed implementations of the collaborator seams.
//!
//! Clients are built from the standard SDK credential chain (environment,
//! profile, IMDS, task role) resolved once in `main`.

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use tracing::debug;

use crate::batcher::LogEvent;
use crate::error::{ShipperError, ShipperResult};
use crate::store::ObjectStore;
use crate::stream::{LogStreamStore, StreamInfo};

/// S3-backed object retrieval.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch(&self, bucket: &str, key: &str) -> ShipperResult<Vec<u8>> {
        debug!(bucket, key, "fetching object");
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                ShipperError::object_fetch(
                    bucket,
                    key,
                    format!("{}", aws_sdk_s3::error::DisplayErrorContext(e)),
                )
            })?;
        let body = response
            .body
            .collect()
            .await
            .map_err(|e| ShipperError::object_fetch(bucket, key, e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}

/// CloudWatch Logs-backed stream store.
pub struct CloudWatchLogStore {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogStore {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudwatchlogs::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl LogStreamStore for CloudWatchLogStore {
    async fn describe_stream(
        &self,
        group: &str,
        name_prefix: &str,
    ) -> ShipperResult<Option<StreamInfo>> {
        let response = self
            .client
            .describe_log_streams()
            .log_group_name(group)
            .log_stream_name_prefix(name_prefix)
            .send()
            .await
            .map_err(|e| {
                ShipperError::stream_resolve(
                    group,
                    name_prefix,
                    format!("{}", aws_sdk_cloudwatchlogs::error::DisplayErrorContext(e)),
                )
            })?;

        Ok(response.log_streams().first().map(|stream| StreamInfo {
            name: stream.log_stream_name().unwrap_or_default().to_string(),
            upload_sequence_token: stream.upload_sequence_token().map(String::from),
        }))
    }

    async fn create_stream(&self, group: &str, name: &str) -> ShipperResult<()> {
        self.client
            .create_log_stream()
            .log_group_name(group)
            .log_stream_name(name)
            .send()
            .await
            .map_err(|e| {
                ShipperError::stream_resolve(
                    group,
                    name,
                    format!("{}", aws_sdk_cloudwatchlogs::error::DisplayErrorContext(e)),
                )
            })?;
        Ok(())
    }

    async fn put_events(
        &self,
        group: &str,
        name: &str,
        events: &[LogEvent],
        sequence_token: Option<&str>,
    ) -> ShipperResult<Option<String>> {
        let log_events = events
            .iter()
            .map(|e| {
                InputLogEvent::builder()
                    .message(e.message.as_str())
                    .timestamp(e.timestamp)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ShipperError::put_events(group, name, e.to_string()))?;

        debug!(group, stream = name, count = log_events.len(), "putting log events");
        let response = self
            .client
            .put_log_events()
            .log_group_name(group)
            .log_stream_name(name)
            .set_sequence_token(sequence_token.map(String::from))
            .set_log_events(Some(log_events))
            .send()
            .await
            .map_err(|e| {
                ShipperError::put_events(
                    group,
                    name,
                    format!("{}", aws_sdk_cloudwatchlogs::error::DisplayErrorContext(e)),
                )
            })?;

        Ok(response.next_sequence_token().map(String::from))
    }
}
