//! Log-stream resolution and sequence-token handling.
//!
//! CloudWatch Logs enforces a single-writer protocol: each PutLogEvents
//! call must present the token returned by the previous successful call
//! on that stream. The sequencer owns the token for the duration of one
//! object's processing; a failed submission leaves it at the last
//! accepted value so the next batch still carries a valid token.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::batcher::LogEvent;
use crate::error::{ShipperError, ShipperResult};

/// Remote stream metadata returned by a describe call.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub name: String,
    pub upload_sequence_token: Option<String>,
}

/// Remote append-only log-stream service.
#[async_trait]
pub trait LogStreamStore: Send + Sync {
    /// Look up a stream by exact-name prefix within a group.
    async fn describe_stream(
        &self,
        group: &str,
        name_prefix: &str,
    ) -> ShipperResult<Option<StreamInfo>>;

    /// Create a stream within a group.
    async fn create_stream(&self, group: &str, name: &str) -> ShipperResult<()>;

    /// Append events to a stream, presenting the current sequence token.
    /// Returns the token for the next write.
    async fn put_events(
        &self,
        group: &str,
        name: &str,
        events: &[LogEvent],
        sequence_token: Option<&str>,
    ) -> ShipperResult<Option<String>>;
}

/// Drives one stream's token across a sequence of batch submissions.
pub struct StreamSequencer<'a> {
    store: &'a dyn LogStreamStore,
    group: String,
    stream: String,
    token: Option<String>,
}

impl<'a> StreamSequencer<'a> {
    /// Resolve a sequencer for the named stream, creating the stream if it
    /// does not exist yet. A brand-new stream resolves with no token.
    pub async fn resolve(
        store: &'a dyn LogStreamStore,
        group: &str,
        stream: &str,
    ) -> ShipperResult<StreamSequencer<'a>> {
        info!(group, stream, "resolving log stream");
        let existing = store.describe_stream(group, stream).await?;

        let info = match existing {
            Some(info) => info,
            None => {
                info!(group, stream, "creating log stream");
                store.create_stream(group, stream).await?;
                store
                    .describe_stream(group, stream)
                    .await?
                    .ok_or_else(|| {
                        ShipperError::stream_resolve(
                            group,
                            stream,
                            "stream missing after create",
                        )
                    })?
            }
        };

        Ok(StreamSequencer {
            store,
            group: group.to_string(),
            stream: stream.to_string(),
            token: info.upload_sequence_token,
        })
    }

    /// Submit one sealed batch. Events are sorted ascending by timestamp
    /// first; the remote service rejects a write whose timestamps are not
    /// non-decreasing. On success the returned token replaces the current
    /// one; on failure the token is left unchanged and the batch is lost
    /// for this invocation.
    async fn submit(&mut self, mut batch: Vec<LogEvent>) -> ShipperResult<usize> {
        batch.sort_by_key(|e| e.timestamp);
        let count = batch.len();
        let next = self
            .store
            .put_events(&self.group, &self.stream, &batch, self.token.as_deref())
            .await?;
        self.token = next;
        Ok(count)
    }

    /// Submit sealed batches in order, each exactly once, continuing past
    /// failures. Returns the number of events actually delivered.
    pub async fn submit_all(&mut self, batches: Vec<Vec<LogEvent>>) -> usize {
        let batch_total = batches.iter().filter(|b| !b.is_empty()).count();
        let mut delivered_events = 0;
        let mut delivered_batches = 0;

        for batch in batches {
            if batch.is_empty() {
                continue;
            }
            match self.submit(batch).await {
                Ok(count) => {
                    delivered_events += count;
                    delivered_batches += 1;
                }
                Err(err) => {
                    // Token is unchanged; the next batch retries with it.
                    error!(
                        group = %self.group,
                        stream = %self.stream,
                        error = %err,
                        "batch submission failed, batch dropped for this invocation"
                    );
                }
            }
        }

        if delivered_batches < batch_total {
            warn!(
                delivered_batches,
                batch_total, "not every sealed batch was delivered"
            );
        }
        info!(
            group = %self.group,
            stream = %self.stream,
            delivered_events,
            delivered_batches,
            "finished submitting batches"
        );
        delivered_events
    }

    /// Current write token, if the stream has accepted any writes yet.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Describe,
        Create,
        Put {
            token: Option<String>,
            timestamps: Vec<i64>,
        },
    }

    /// In-memory stream store that hands out incrementing tokens and can
    /// fail selected put calls.
    struct FakeStore {
        exists_initially: bool,
        initial_token: Option<String>,
        fail_puts: Vec<usize>,
        calls: Mutex<Vec<Call>>,
        puts_seen: Mutex<usize>,
    }

    impl FakeStore {
        fn new(exists_initially: bool, initial_token: Option<&str>) -> Self {
            Self {
                exists_initially,
                initial_token: initial_token.map(String::from),
                fail_puts: Vec::new(),
                calls: Mutex::new(Vec::new()),
                puts_seen: Mutex::new(0),
            }
        }

        fn failing_put(mut self, index: usize) -> Self {
            self.fail_puts.push(index);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn created(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Create))
                .count()
        }
    }

    #[async_trait]
    impl LogStreamStore for FakeStore {
        async fn describe_stream(
            &self,
            _group: &str,
            _prefix: &str,
        ) -> ShipperResult<Option<StreamInfo>> {
            let mut calls = self.calls.lock().unwrap();
            let created = calls.iter().any(|c| matches!(c, Call::Create));
            calls.push(Call::Describe);
            if self.exists_initially || created {
                Ok(Some(StreamInfo {
                    name: "stream".to_string(),
                    upload_sequence_token: self.initial_token.clone(),
                }))
            } else {
                Ok(None)
            }
        }

        async fn create_stream(&self, _group: &str, _name: &str) -> ShipperResult<()> {
            self.calls.lock().unwrap().push(Call::Create);
            Ok(())
        }

        async fn put_events(
            &self,
            group: &str,
            name: &str,
            events: &[LogEvent],
            sequence_token: Option<&str>,
        ) -> ShipperResult<Option<String>> {
            let index = {
                let mut seen = self.puts_seen.lock().unwrap();
                let index = *seen;
                *seen += 1;
                index
            };
            self.calls.lock().unwrap().push(Call::Put {
                token: sequence_token.map(String::from),
                timestamps: events.iter().map(|e| e.timestamp).collect(),
            });
            if self.fail_puts.contains(&index) {
                return Err(ShipperError::put_events(group, name, "throttled"));
            }
            Ok(Some(format!("token-{}", index + 1)))
        }
    }

    fn batch(timestamps: &[i64]) -> Vec<LogEvent> {
        timestamps
            .iter()
            .map(|t| LogEvent::new(format!("m{}", t), *t))
            .collect()
    }

    #[tokio::test]
    async fn test_resolve_existing_stream() {
        let store = FakeStore::new(true, Some("tok"));
        let seq = StreamSequencer::resolve(&store, "group", "stream")
            .await
            .unwrap();
        assert_eq!(seq.token(), Some("tok"));
        assert_eq!(store.created(), 0);
    }

    #[tokio::test]
    async fn test_resolve_creates_missing_stream_once() {
        let store = FakeStore::new(false, None);
        let seq = StreamSequencer::resolve(&store, "group", "stream")
            .await
            .unwrap();
        assert_eq!(seq.token(), None);
        assert_eq!(store.created(), 1);
        // describe, create, describe -- and no puts yet
        assert_eq!(
            store.calls(),
            vec![Call::Describe, Call::Create, Call::Describe]
        );
    }

    #[tokio::test]
    async fn test_submit_sorts_and_advances_token() {
        let store = FakeStore::new(true, Some("tok-0"));
        let mut seq = StreamSequencer::resolve(&store, "group", "stream")
            .await
            .unwrap();
        let delivered = seq
            .submit_all(vec![batch(&[3, 1, 2]), batch(&[5, 4])])
            .await;
        assert_eq!(delivered, 5);
        assert_eq!(seq.token(), Some("token-2"));

        let puts: Vec<Call> = store
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Put { .. }))
            .collect();
        assert_eq!(
            puts,
            vec![
                Call::Put {
                    token: Some("tok-0".to_string()),
                    timestamps: vec![1, 2, 3],
                },
                Call::Put {
                    token: Some("token-1".to_string()),
                    timestamps: vec![4, 5],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_put_keeps_token_and_continues() {
        let store = FakeStore::new(true, Some("tok-0")).failing_put(0);
        let mut seq = StreamSequencer::resolve(&store, "group", "stream")
            .await
            .unwrap();
        let delivered = seq.submit_all(vec![batch(&[1]), batch(&[2])]).await;
        // First batch lost, second delivered with the original token.
        assert_eq!(delivered, 1);
        assert_eq!(seq.token(), Some("token-2"));

        let puts: Vec<Call> = store
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Put { .. }))
            .collect();
        assert_eq!(
            puts,
            vec![
                Call::Put {
                    token: Some("tok-0".to_string()),
                    timestamps: vec![1],
                },
                Call::Put {
                    token: Some("tok-0".to_string()),
                    timestamps: vec![2],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_batches_skipped() {
        let store = FakeStore::new(true, None);
        let mut seq = StreamSequencer::resolve(&store, "group", "stream")
            .await
            .unwrap();
        let delivered = seq.submit_all(vec![Vec::new()]).await;
        assert_eq!(delivered, 0);
        assert!(store
            .calls()
            .iter()
            .all(|c| !matches!(c, Call::Put { .. })));
    }
}
