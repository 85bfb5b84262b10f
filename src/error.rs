//! Error types shared across the shipping pipeline.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type ShipperResult<T> = Result<T, ShipperError>;

/// Errors produced while shipping a load-balancer log object.
///
/// Malformed records and fetch/decompress/stream failures abort only the
/// notification that raised them; batch submission failures are handled
/// inside the sequencer and never reach the caller.
#[derive(Debug, Error)]
pub enum ShipperError {
    /// Invalid or missing process configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An event record is missing a required part (bucket, key, event name).
    #[error("malformed event record: {0}")]
    MalformedRecord(String),

    /// The raw log object could not be retrieved.
    #[error("failed to fetch s3://{bucket}/{key}: {message}")]
    ObjectFetch {
        bucket: String,
        key: String,
        message: String,
    },

    /// The fetched payload could not be decompressed or decoded.
    #[error("failed to decompress log payload: {0}")]
    Decompress(String),

    /// The target log stream could not be resolved or created.
    #[error("failed to resolve log stream {group}/{stream}: {message}")]
    StreamResolve {
        group: String,
        stream: String,
        message: String,
    },

    /// A batch of events was rejected by the remote log service.
    #[error("failed to put log events to {group}/{stream}: {message}")]
    PutEvents {
        group: String,
        stream: String,
        message: String,
    },
}

impl ShipperError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ShipperError::Config(message.into())
    }

    /// Create a malformed-record error.
    pub fn malformed(message: impl Into<String>) -> Self {
        ShipperError::MalformedRecord(message.into())
    }

    /// Create an object-fetch error.
    pub fn object_fetch(
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ShipperError::ObjectFetch {
            bucket: bucket.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a decompression error.
    pub fn decompress(message: impl Into<String>) -> Self {
        ShipperError::Decompress(message.into())
    }

    /// Create a stream-resolution error.
    pub fn stream_resolve(
        group: impl Into<String>,
        stream: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ShipperError::StreamResolve {
            group: group.into(),
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a put-events error.
    pub fn put_events(
        group: impl Into<String>,
        stream: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ShipperError::PutEvents {
            group: group.into(),
            stream: stream.into(),
            message: message.into(),
        }
    }
}
