//! ELB Log Shipper - Lambda entry point.
//!
//! Ships Elastic Load Balancer access logs from S3 into CloudWatch Logs.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use elb_log_shipper::aws::{CloudWatchLogStore, S3ObjectStore};
use elb_log_shipper::event::InvocationEvent;
use elb_log_shipper::{LogShipper, ShipperConfig};
use lambda_runtime::{service_fn, LambdaEvent};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting ELB log shipper");

    let config = ShipperConfig::from_env()?;
    tracing::info!(
        load_balancer_type = %config.load_balancer_type,
        log_group = %config.log_group_name,
        plaintext_logs = config.plaintext_logs,
        "Configuration loaded successfully"
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let shipper = Arc::new(LogShipper::new(
        config,
        Arc::new(S3ObjectStore::new(&sdk_config)),
        Arc::new(CloudWatchLogStore::new(&sdk_config)),
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<InvocationEvent>| {
        let shipper = shipper.clone();
        async move {
            shipper
                .handle(event.payload)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
