//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};

use crate::model::{PermissionRecord, UserRecord};

/// Root configuration for the search gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream search cluster.
    pub upstream: UpstreamConfig,

    /// Credential store settings.
    pub auth: AuthConfig,

    /// Analytics recording settings.
    pub analytics: AnalyticsConfig,

    /// Whole-request timeout.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Upstream search cluster configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the cluster. Overridden by `ES_CLUSTER_URL`.
    pub url: String,

    /// Per-call timeout for forwarded requests in seconds. A firing
    /// timeout maps to 504 for the client.
    pub request_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9200".to_string(),
            request_secs: 10,
        }
    }
}

/// Credential store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Index holding user documents, keyed by username.
    pub users_index: String,

    /// Index holding permission documents, keyed by username.
    pub permissions_index: String,

    /// Credential cache TTL in seconds; 0 disables caching.
    pub cache_ttl_secs: u64,

    /// Inline users. When any inline credentials are declared the gateway
    /// resolves callers from memory instead of the cluster indices.
    pub users: Vec<UserRecord>,

    /// Inline permissions.
    pub permissions: Vec<PermissionRecord>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users_index: ".gateway-users".to_string(),
            permissions_index: ".gateway-permissions".to_string(),
            cache_ttl_secs: 60,
            users: Vec::new(),
            permissions: Vec::new(),
        }
    }
}

impl AuthConfig {
    pub fn has_inline_credentials(&self) -> bool {
        !self.users.is_empty() || !self.permissions.is_empty()
    }
}

/// Analytics recording configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Enable search-analytics recording.
    pub enabled: bool,

    /// Index the records are written to.
    pub index: String,

    /// Bounded queue capacity between the recorder and the workers.
    pub queue_capacity: usize,

    /// Number of background recording workers.
    pub workers: usize,

    /// Per-job timeout for background record builds and writes.
    pub write_timeout_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index: ".gateway-analytics".to_string(),
            queue_capacity: 1024,
            workers: 2,
            write_timeout_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds, enforced as an outer layer.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
