// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Pontoon session bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Pontoon configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; only the helpdesk access token is genuinely required to run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PontoonConfig {
    /// Process pool and control-surface settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Messaging-network connection policy.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Helpdesk API settings.
    #[serde(default)]
    pub helpdesk: HelpdeskConfig,

    /// Webhook command ingestion settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Relay queue settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Correlation store settings.
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process pool and control-surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Number of session workers to spawn. `0` means one per CPU core.
    #[serde(default)]
    pub worker_count: usize,

    /// Base HTTP port. Worker `i` binds `http_port + i`; the primary's
    /// management surface binds `http_port + 100`.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Per-worker timeout when aggregating status across the pool.
    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            worker_count: 0,
            http_port: default_http_port(),
            status_timeout_ms: default_status_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

fn default_http_port() -> u16 {
    3001
}

fn default_status_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Messaging-network connection policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Fixed delay between automatic reconnect attempts.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Automatic reconnects before recovery is handed to the operator.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Pairing challenges issued before the quota stop.
    #[serde(default = "default_max_pairing_attempts")]
    pub max_pairing_attempts: u32,

    /// Interval between liveness sweeps over open sessions.
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,

    /// Per-probe timeout within a liveness sweep.
    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            max_pairing_attempts: default_max_pairing_attempts(),
            health_check_interval_secs: default_health_check_interval_secs(),
            health_check_timeout_secs: default_health_check_timeout_secs(),
        }
    }
}

fn default_reconnect_delay_ms() -> u64 {
    10_000
}

fn default_max_reconnect_attempts() -> u32 {
    4
}

fn default_max_pairing_attempts() -> u32 {
    4
}

fn default_health_check_interval_secs() -> u64 {
    180
}

fn default_health_check_timeout_secs() -> u64 {
    30
}

/// Helpdesk API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HelpdeskConfig {
    /// Base URL of the helpdesk installation.
    #[serde(default = "default_helpdesk_base_url")]
    pub base_url: String,

    /// API access token. `None` fails validation: the bridge cannot
    /// deliver anything without it.
    #[serde(default)]
    pub access_token: Option<String>,

    /// HTTP timeout for helpdesk calls.
    #[serde(default = "default_helpdesk_timeout_ms")]
    pub api_timeout_ms: u64,

    /// Account used when a command does not name one.
    #[serde(default = "default_helpdesk_account_id")]
    pub default_account_id: i64,
}

impl Default for HelpdeskConfig {
    fn default() -> Self {
        Self {
            base_url: default_helpdesk_base_url(),
            access_token: None,
            api_timeout_ms: default_helpdesk_timeout_ms(),
            default_account_id: default_helpdesk_account_id(),
        }
    }
}

fn default_helpdesk_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_helpdesk_timeout_ms() -> u64 {
    15_000
}

fn default_helpdesk_account_id() -> i64 {
    1
}

/// Webhook command ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// First word of an agent message that triggers session management.
    #[serde(default = "default_command_keyword")]
    pub command_keyword: String,

    /// Agent names allowed to run protected commands. Empty together with
    /// `authorized_phone_numbers` means commands are unprotected.
    #[serde(default)]
    pub authorized_agent_names: Vec<String>,

    /// Contact phone numbers allowed to run protected commands.
    #[serde(default)]
    pub authorized_phone_numbers: Vec<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            command_keyword: default_command_keyword(),
            authorized_agent_names: Vec::new(),
            authorized_phone_numbers: Vec::new(),
        }
    }
}

fn default_command_keyword() -> String {
    "raise".to_string()
}

/// Relay queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Delivery attempts before a job is parked as failed.
    #[serde(default = "default_relay_max_attempts")]
    pub max_attempts: u32,

    /// Delay before a failed job is retried.
    #[serde(default = "default_relay_backoff_ms")]
    pub backoff_ms: u64,

    /// Consumer polling interval when the queue is idle.
    #[serde(default = "default_relay_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bound on how long event ingestion may block on an enqueue.
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_relay_max_attempts(),
            backoff_ms: default_relay_backoff_ms(),
            poll_interval_ms: default_relay_poll_interval_ms(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
        }
    }
}

fn default_relay_max_attempts() -> u32 {
    3
}

fn default_relay_backoff_ms() -> u64 {
    5_000
}

fn default_relay_poll_interval_ms() -> u64 {
    500
}

fn default_enqueue_timeout_ms() -> u64 {
    2_000
}

/// Correlation store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CorrelationConfig {
    /// Lifetime of a foreign-id to helpdesk-id mapping.
    #[serde(default = "default_correlation_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_correlation_ttl_secs(),
        }
    }
}

fn default_correlation_ttl_secs() -> u64 {
    60 * 60 * 24 * 7
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file shared by all processes.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("pontoon").join("pontoon.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "pontoon.db".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = PontoonConfig::default();
        assert_eq!(config.server.http_port, 3001);
        assert_eq!(config.server.status_timeout_ms, 5_000);
        assert_eq!(config.network.max_pairing_attempts, 4);
        assert_eq!(config.network.max_reconnect_attempts, 4);
        assert_eq!(config.network.reconnect_delay_ms, 10_000);
        assert_eq!(config.relay.max_attempts, 3);
        assert_eq!(config.correlation.ttl_secs, 604_800);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[network]
reconect_delay_ms = 5000
"#;
        assert!(toml::from_str::<PontoonConfig>(toml_str).is_err());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let toml_str = r#"
[helpdesk]
access_token = "secret"
"#;
        let config: PontoonConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.helpdesk.access_token.as_deref(), Some("secret"));
        assert_eq!(config.helpdesk.base_url, "http://localhost:3000");
        assert_eq!(config.helpdesk.api_timeout_ms, 15_000);
    }
}
