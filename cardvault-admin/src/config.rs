//! Configuration resolution for cardvault-admin
//!
//! Scryfall base URL priority: command line → ENV → TOML → built-in default.

use cardvault_common::config::{TomlConfig, DEFAULT_SCRYFALL_BASE_URL};
use tracing::{info, warn};

pub const SCRYFALL_URL_ENV: &str = "CARDVAULT_SCRYFALL_URL";

/// Resolve the external card-data base URL
pub fn resolve_scryfall_base_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> String {
    let env_value = std::env::var(SCRYFALL_URL_ENV).ok();
    resolve_from_sources(
        cli_arg,
        env_value.as_deref(),
        toml_config.scryfall_base_url.as_deref(),
    )
}

fn resolve_from_sources(cli: Option<&str>, env: Option<&str>, toml: Option<&str>) -> String {
    let candidates = [
        ("command line", cli.filter(|v| is_valid_url(v))),
        ("environment", env.filter(|v| is_valid_url(v))),
        ("TOML", toml.filter(|v| is_valid_url(v))),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(name, _)| *name)
        .collect();

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Scryfall base URL found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (name, value) in candidates {
        if let Some(url) = value {
            info!("Scryfall base URL loaded from {}: {}", name, url.trim());
            return url.trim().trim_end_matches('/').to_string();
        }
    }

    DEFAULT_SCRYFALL_BASE_URL.to_string()
}

/// Non-empty http(s) URL
pub fn is_valid_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}
