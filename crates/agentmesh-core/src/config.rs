//! Configuration for an AgentMesh service process.

use serde::{Deserialize, Serialize};

/// Service configuration, typically loaded from a config file by the host
/// binary and overridable through the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Externally reachable base URL, used in the agent card and as the
    /// JWT issuer for push deliveries.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Catalog to register with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_url: Option<String>,

    /// Catalog heartbeat interval in seconds.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Deadline for non-streaming RPC handlers, in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Push delivery retry tuning.
    #[serde(default)]
    pub push: PushConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_url: default_public_url(),
            catalog_url: None,
            heartbeat_secs: default_heartbeat_secs(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            push: PushConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_public_url() -> String {
    "http://localhost:8080".into()
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

/// Push delivery retry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Retries after the initial attempt.
    #[serde(default = "default_push_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds; doubles per retry.
    #[serde(default = "default_push_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_push_attempt_secs")]
    pub attempt_timeout_secs: u64,

    /// Overall delivery budget in seconds.
    #[serde(default = "default_push_budget_secs")]
    pub total_budget_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            max_retries: default_push_retries(),
            initial_backoff_ms: default_push_backoff_ms(),
            attempt_timeout_secs: default_push_attempt_secs(),
            total_budget_secs: default_push_budget_secs(),
        }
    }
}

impl From<&PushConfig> for crate::push::RetryPolicy {
    fn from(config: &PushConfig) -> Self {
        use std::time::Duration;
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            total_budget: Duration::from_secs(config.total_budget_secs),
        }
    }
}

fn default_push_retries() -> u32 {
    5
}

fn default_push_backoff_ms() -> u64 {
    1000
}

fn default_push_attempt_secs() -> u64 {
    10
}

fn default_push_budget_secs() -> u64 {
    300
}

/// Telemetry/observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether to export traces over OTLP.
    #[serde(default)]
    pub enabled: bool,

    /// OTLP exporter endpoint.
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
        }
    }
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.rpc_timeout_secs, 30);
        assert_eq!(config.push.max_retries, 5);
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_retry_policy_conversion() {
        let config = PushConfig {
            max_retries: 2,
            initial_backoff_ms: 250,
            attempt_timeout_secs: 3,
            total_budget_secs: 60,
        };
        let policy: crate::push::RetryPolicy = (&config).into();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.initial_backoff.as_millis(), 250);
    }
}
