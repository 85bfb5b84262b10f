//! Schema registry for load-balancer log formats.
//!
//! Maps a (load-balancer type, log kind) pair to the ordered field list of
//! one log line, and a (load-balancer type, field name) pair to an optional
//! transform that derives extra fields from a single token. Transforms are
//! resolved once at pipeline construction and handed to the parser by
//! reference; nothing here is looked up through ambient state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::ShipperError;

/// Load-balancer log format family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalancerType {
    /// Classic ELB
    Classic,
    /// Application Load Balancer
    Application,
    /// Network Load Balancer
    Network,
}

impl LoadBalancerType {
    /// Whether log objects for this type are delivered gzip-compressed.
    /// Classic ELBs write plaintext objects; the others gzip.
    pub fn compressed_delivery(&self) -> bool {
        !matches!(self, LoadBalancerType::Classic)
    }
}

impl FromStr for LoadBalancerType {
    type Err = ShipperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(LoadBalancerType::Classic),
            "application" => Ok(LoadBalancerType::Application),
            "network" => Ok(LoadBalancerType::Network),
            other => Err(ShipperError::config(format!(
                "unknown load balancer type '{}'. Valid types: classic, application, network",
                other
            ))),
        }
    }
}

impl fmt::Display for LoadBalancerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadBalancerType::Classic => "classic",
            LoadBalancerType::Application => "application",
            LoadBalancerType::Network => "network",
        };
        f.write_str(name)
    }
}

/// Log category within one load-balancer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Access,
    Connection,
}

impl LogKind {
    /// Derive the log kind from an object key. Connection logs land under
    /// a `conn_log` prefix; everything else is an access log.
    pub fn from_key(key: &str) -> Self {
        if key.contains("conn_log") {
            LogKind::Connection
        } else {
            LogKind::Access
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Access => f.write_str("access"),
            LogKind::Connection => f.write_str("connection"),
        }
    }
}

/// Ordered field list for one log kind, plus the name of its time column.
#[derive(Debug)]
pub struct LogSchema {
    pub fields: &'static [&'static str],
    pub time_field: &'static str,
}

impl LogSchema {
    /// Positional index of the time column within the field list.
    pub fn time_index(&self) -> Option<usize> {
        self.fields.iter().position(|f| *f == self.time_field)
    }
}

static CLASSIC_ACCESS: LogSchema = LogSchema {
    fields: &[
        "time",
        "elb",
        "client:port",
        "backend:port",
        "request_processing_time",
        "backend_processing_time",
        "response_processing_time",
        "elb_status_code",
        "backend_status_code",
        "received_bytes",
        "sent_bytes",
        "request",
        "user_agent",
        "ssl_cipher",
        "ssl_protocol",
    ],
    time_field: "time",
};

static NETWORK_ACCESS: LogSchema = LogSchema {
    fields: &[
        "type",
        "version",
        "time",
        "elb",
        "listener",
        "client:port",
        "destination:port",
        "connection_time",
        "tls_handshake_time",
        "received_bytes",
        "sent_bytes",
        "incoming_tls_alert",
        "chosen_cert_arn",
        "chosen_cert_serial",
        "tls_cipher",
        "tls_protocol_version",
        "tls_named_group",
        "domain_name",
        "alpn_fe_protocol",
        "alpn_be_protocol",
        "alpn_client_preference_list",
    ],
    time_field: "time",
};

static APPLICATION_ACCESS: LogSchema = LogSchema {
    fields: &[
        "type",
        "time",
        "elb",
        "client:port",
        "target:port",
        "request_processing_time",
        "target_processing_time",
        "response_processing_time",
        "elb_status_code",
        "target_status_code",
        "received_bytes",
        "sent_bytes",
        "request",
        "user_agent",
        "ssl_cipher",
        "ssl_protocol",
        "target_group_arn",
        "trace_id",
        "domain_name",
        "chosen_cert_arn",
        "matched_rule_priority",
        "request_creation_time",
        "actions_executed",
        "redirect_url",
        "error_reason",
        "target:port_list",
        "target_status_code_list",
        "classification",
        "classification_reason",
    ],
    time_field: "time",
};

static APPLICATION_CONNECTION: LogSchema = LogSchema {
    fields: &[
        "timestamp",
        "client_ip",
        "client_port",
        "listener_port",
        "tls_protocol",
        "tls_cipher",
        "tls_handshake_latency",
        "leaf_client_cert_subject",
        "leaf_client_cert_validity",
        "leaf_client_cert_serial_number",
        "tls_verify_status",
    ],
    time_field: "timestamp",
};

/// Look up the schema for a (load-balancer type, log kind) pair.
/// Returns `None` for unregistered pairs (e.g. classic connection logs).
pub fn schema_for(lb_type: LoadBalancerType, kind: LogKind) -> Option<&'static LogSchema> {
    match (lb_type, kind) {
        (LoadBalancerType::Classic, LogKind::Access) => Some(&CLASSIC_ACCESS),
        (LoadBalancerType::Network, LogKind::Access) => Some(&NETWORK_ACCESS),
        (LoadBalancerType::Application, LogKind::Access) => Some(&APPLICATION_ACCESS),
        (LoadBalancerType::Application, LogKind::Connection) => Some(&APPLICATION_CONNECTION),
        _ => None,
    }
}

/// A per-field transform: given the raw token and the in-progress parsed
/// record, derive additional fields. Must depend only on its own token.
pub type FieldTransform = fn(&str, &mut Map<String, Value>);

/// Transform lookup for one load-balancer type, resolved once when the
/// pipeline is built and passed by reference into the line parser.
#[derive(Debug, Clone, Copy)]
pub struct TransformRegistry {
    lb_type: LoadBalancerType,
}

impl TransformRegistry {
    pub fn new(lb_type: LoadBalancerType) -> Self {
        Self { lb_type }
    }

    /// Resolve the transform registered for a field, if any.
    pub fn resolve(&self, field: &str) -> Option<FieldTransform> {
        match (self.lb_type, field) {
            (LoadBalancerType::Application, "client:port") => Some(split_client_port),
            (LoadBalancerType::Application, "target:port") => Some(split_target_port),
            (LoadBalancerType::Application, "request") => Some(decompose_request),
            _ => None,
        }
    }
}

/// Split a `host:port` token at the last colon so IPv6 addresses survive.
fn split_endpoint(token: &str) -> (&str, &str) {
    match token.rfind(':') {
        Some(idx) => (&token[..idx], &token[idx + 1..]),
        None => (token, ""),
    }
}

fn split_client_port(token: &str, parsed: &mut Map<String, Value>) {
    let (ip, port) = split_endpoint(token);
    parsed.insert("client_ip".to_string(), Value::String(ip.to_string()));
    parsed.insert("client_port".to_string(), Value::String(port.to_string()));
}

fn split_target_port(token: &str, parsed: &mut Map<String, Value>) {
    let (ip, port) = split_endpoint(token);
    parsed.insert("target_ip".to_string(), Value::String(ip.to_string()));
    parsed.insert("target_port".to_string(), Value::String(port.to_string()));
}

/// Decompose the quoted `request` field (`METHOD URI HTTP-VERSION`) into
/// method/uri/version plus the URI's scheme, host, port, path and query.
fn decompose_request(token: &str, parsed: &mut Map<String, Value>) {
    let mut parts = token.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let mut uri = parts.next().unwrap_or_default();
    let version = parts.next().unwrap_or_default();

    // Unroutable requests carry a trailing "-" or "?" on the URI.
    if uri.ends_with('-') || uri.ends_with('?') {
        uri = &uri[..uri.len() - 1];
    }

    parsed.insert(
        "request_method".to_string(),
        Value::String(method.to_string()),
    );
    parsed.insert("request_uri".to_string(), Value::String(uri.to_string()));
    parsed.insert(
        "request_http_version".to_string(),
        Value::String(version.to_string()),
    );

    if let Ok(url) = Url::parse(uri) {
        parsed.insert(
            "request_uri_scheme".to_string(),
            Value::String(format!("{}:", url.scheme())),
        );
        if let Some(host) = url.host_str() {
            parsed.insert(
                "request_uri_host".to_string(),
                Value::String(host.to_string()),
            );
        }
        if let Some(port) = url.port() {
            parsed.insert("request_uri_port".to_string(), Value::from(port));
        }
        parsed.insert(
            "request_uri_path".to_string(),
            Value::String(url.path().to_string()),
        );
        if let Some(query) = url.query() {
            parsed.insert(
                "request_uri_query".to_string(),
                Value::String(query.to_string()),
            );
        }
    }
}
