//! Adapter-wide defaults.
//!
//! # Example
//!
//! ```
//! use sync_core::SyncConfig;
//!
//! let config = SyncConfig::default().with_emulate_http(true);
//! assert!(config.emulate_http);
//! assert!(!config.emulate_json);
//! ```

use serde::Deserialize;

/// Defaults applied when a call's `SyncOptions` leaves a flag unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Tunnel PUT/PATCH/DELETE through POST with a method override.
    #[serde(default)]
    pub emulate_http: bool,

    /// Send bodies as `application/x-www-form-urlencoded`.
    #[serde(default)]
    pub emulate_json: bool,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `SYNC_EMULATE_HTTP` and `SYNC_EMULATE_JSON` from the environment.
    pub fn from_env() -> Self {
        Self {
            emulate_http: env_flag("SYNC_EMULATE_HTTP"),
            emulate_json: env_flag("SYNC_EMULATE_JSON"),
        }
    }

    pub fn with_emulate_http(mut self, emulate: bool) -> Self {
        self.emulate_http = emulate;
        self
    }

    pub fn with_emulate_json(mut self, emulate: bool) -> Self {
        self.emulate_json = emulate;
        self
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
