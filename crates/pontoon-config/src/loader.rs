// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./pontoon.toml` > `~/.config/pontoon/pontoon.toml`
//! > `/etc/pontoon/pontoon.toml`, with environment variable overrides via the
//! `PONTOON_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PontoonConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/pontoon/pontoon.toml` (system-wide)
/// 3. `~/.config/pontoon/pontoon.toml` (user XDG config)
/// 4. `./pontoon.toml` (local directory)
/// 5. `PONTOON_*` environment variables
pub fn load_config() -> Result<PontoonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PontoonConfig::default()))
        .merge(Toml::file("/etc/pontoon/pontoon.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("pontoon/pontoon.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("pontoon.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PontoonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PontoonConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PontoonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PontoonConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PONTOON_HELPDESK_ACCESS_TOKEN` must map
/// to `helpdesk.access_token`, not `helpdesk.access.token`.
fn env_provider() -> Env {
    Env::prefixed("PONTOON_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("network_", "network.", 1)
            .replacen("helpdesk_", "helpdesk.", 1)
            .replacen("webhook_", "webhook.", 1)
            .replacen("relay_", "relay.", 1)
            .replacen("correlation_", "correlation.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}
