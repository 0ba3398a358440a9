// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: required secrets, positive attempt bounds, sane ports.

use crate::diagnostic::ConfigError;
use crate::model::PontoonConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PontoonConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // The bridge cannot deliver anything without a helpdesk token.
    match &config.helpdesk.access_token {
        None => errors.push(ConfigError::Validation {
            message: "helpdesk.access_token is required (set PONTOON_HELPDESK_ACCESS_TOKEN or add it to pontoon.toml)".to_string(),
        }),
        Some(token) if token.trim().is_empty() => errors.push(ConfigError::Validation {
            message: "helpdesk.access_token must not be empty".to_string(),
        }),
        Some(_) => {}
    }

    if config.helpdesk.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "helpdesk.base_url must not be empty".to_string(),
        });
    } else if !config.helpdesk.base_url.starts_with("http://")
        && !config.helpdesk.base_url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "helpdesk.base_url `{}` must start with http:// or https://",
                config.helpdesk.base_url
            ),
        });
    }

    if config.helpdesk.default_account_id <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "helpdesk.default_account_id must be positive, got {}",
                config.helpdesk.default_account_id
            ),
        });
    }

    if config.network.max_pairing_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "network.max_pairing_attempts must be at least 1".to_string(),
        });
    }

    if config.network.max_reconnect_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "network.max_reconnect_attempts must be at least 1".to_string(),
        });
    }

    if config.relay.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.max_attempts must be at least 1".to_string(),
        });
    }

    if config.server.http_port == 0 {
        errors.push(ConfigError::Validation {
            message: "server.http_port must not be 0".to_string(),
        });
    }

    if config.server.status_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "server.status_timeout_ms must be positive".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.webhook.command_keyword.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "webhook.command_keyword must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
