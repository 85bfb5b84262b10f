//! Ships Elastic Load Balancer access logs from S3 into CloudWatch Logs.
//!
//! Load balancers deliver access and connection logs as (usually gzipped)
//! objects in S3. This crate consumes the resulting object notifications
//! (directly, or wrapped in SQS messages), parses each line against the
//! load-balancer variant's field schema, batches the events under the
//! CloudWatch Logs payload caps, and appends them in timestamp order to a
//! log stream named after the object key, driving CloudWatch's
//! sequence-token protocol.
//!
//! # Configuration
//!
//! Environment variables, read once at startup:
//!
//! ```text
//! LOAD_BALANCER_TYPE = classic | application | network
//! LOG_GROUP_NAME     = /aws/elb/my-load-balancer
//! PLAINTEXT_LOGS     = 1        # optional: ship raw lines instead of JSON
//! ```

pub mod aws;
pub mod batcher;
pub mod config;
pub mod error;
pub mod event;
pub mod parser;
pub mod schema;
pub mod shipper;
pub mod store;
pub mod stream;

pub use config::ShipperConfig;
pub use error::{ShipperError, ShipperResult};
pub use shipper::LogShipper;
