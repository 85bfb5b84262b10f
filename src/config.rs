//! Process configuration.
//!
//! Built once at process entry from environment variables and threaded by
//! reference through the pipeline; nothing deeper reads the environment.

use std::env;

use crate::error::{ShipperError, ShipperResult};
use crate::schema::LoadBalancerType;

const LOAD_BALANCER_TYPE_ENV: &str = "LOAD_BALANCER_TYPE";
const LOG_GROUP_NAME_ENV: &str = "LOG_GROUP_NAME";
const PLAINTEXT_LOGS_ENV: &str = "PLAINTEXT_LOGS";

/// Complete configuration for the shipper.
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    /// Which load-balancer log format family to parse.
    pub load_balancer_type: LoadBalancerType,

    /// CloudWatch Logs group the streams live under.
    pub log_group_name: String,

    /// Emit raw log lines instead of the structured JSON rendering.
    pub plaintext_logs: bool,
}

impl ShipperConfig {
    pub fn new(
        load_balancer_type: LoadBalancerType,
        log_group_name: impl Into<String>,
        plaintext_logs: bool,
    ) -> ShipperResult<Self> {
        let log_group_name = log_group_name.into();
        if log_group_name.is_empty() {
            return Err(ShipperError::config("log group name cannot be empty"));
        }
        Ok(Self {
            load_balancer_type,
            log_group_name,
            plaintext_logs,
        })
    }

    /// Load configuration from the environment.
    pub fn from_env() -> ShipperResult<Self> {
        let lb_type = env::var(LOAD_BALANCER_TYPE_ENV)
            .map_err(|_| {
                ShipperError::config(format!(
                    "{} environment variable not set. \
                     Valid values: classic, application, network",
                    LOAD_BALANCER_TYPE_ENV
                ))
            })?
            .parse::<LoadBalancerType>()?;

        let log_group_name = env::var(LOG_GROUP_NAME_ENV).map_err(|_| {
            ShipperError::config(format!(
                "{} environment variable not set",
                LOG_GROUP_NAME_ENV
            ))
        })?;

        let plaintext_logs = env::var(PLAINTEXT_LOGS_ENV)
            .map(|v| truthy(&v))
            .unwrap_or(false);

        Self::new(lb_type, log_group_name, plaintext_logs)
    }
}

fn truthy(value: &str) -> bool {
    !matches!(value.trim(), "" | "0" | "false" | "no")
}
