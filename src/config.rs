/// Extension configuration
///
/// Every field has a default, so an empty or partial `deepwikiConfig`
/// object in chrome.storage.local is valid.
use serde::{Deserialize, Serialize};

use crate::messenger::RetryPolicy;
use crate::panel::LoadPolicy;

/// Storage key holding optional configuration overrides
pub const CONFIG_STORAGE_KEY: &str = "deepwikiConfig";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionConfig {
    /// Host whose pages are resolved into repositories
    #[serde(default = "default_source_host")]
    pub source_host: String,

    /// Host serving the documentation pages
    #[serde(default = "default_doc_host")]
    pub doc_host: String,

    /// Side panel page, relative to the extension root
    #[serde(default = "default_panel_path")]
    pub panel_path: String,

    /// Send a HEAD request before the first display of a repo
    #[serde(default = "default_probe_enabled")]
    pub probe_enabled: bool,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u32,

    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u32,

    #[serde(default = "default_load_retry_delay_ms")]
    pub load_retry_delay_ms: u32,

    /// Attempts after the first one before the error view is shown
    #[serde(default = "default_max_load_retries")]
    pub max_load_retries: u32,

    #[serde(default = "default_message_attempts")]
    pub message_attempts: u32,

    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u32,

    #[serde(default = "default_message_base_delay_ms")]
    pub message_base_delay_ms: u32,

    /// One of error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_source_host() -> String {
    "github.com".to_string()
}

fn default_doc_host() -> String {
    "deepwiki.com".to_string()
}

fn default_panel_path() -> String {
    "sidepanel.html".to_string()
}

fn default_probe_enabled() -> bool {
    true
}

fn default_probe_timeout_ms() -> u32 {
    3_000
}

fn default_load_timeout_ms() -> u32 {
    10_000
}

fn default_load_retry_delay_ms() -> u32 {
    2_000
}

fn default_max_load_retries() -> u32 {
    2
}

fn default_message_attempts() -> u32 {
    3
}

fn default_message_timeout_ms() -> u32 {
    1_000
}

fn default_message_base_delay_ms() -> u32 {
    200
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        ExtensionConfig {
            source_host: default_source_host(),
            doc_host: default_doc_host(),
            panel_path: default_panel_path(),
            probe_enabled: default_probe_enabled(),
            probe_timeout_ms: default_probe_timeout_ms(),
            load_timeout_ms: default_load_timeout_ms(),
            load_retry_delay_ms: default_load_retry_delay_ms(),
            max_load_retries: default_max_load_retries(),
            message_attempts: default_message_attempts(),
            message_timeout_ms: default_message_timeout_ms(),
            message_base_delay_ms: default_message_base_delay_ms(),
            log_level: default_log_level(),
        }
    }
}

impl ExtensionConfig {
    /// Parse overrides from a JSON value, falling back to defaults on any error
    pub fn from_json(value: &serde_json::Value) -> ExtensionConfig {
        if value.is_null() {
            return ExtensionConfig::default();
        }
        match serde_json::from_value(value.clone()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring malformed {}: {}", CONFIG_STORAGE_KEY, e);
                ExtensionConfig::default()
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.message_attempts.max(1),
            attempt_timeout_ms: self.message_timeout_ms,
            base_delay_ms: self.message_base_delay_ms,
        }
    }

    pub fn load_policy(&self) -> LoadPolicy {
        LoadPolicy {
            timeout_ms: self.load_timeout_ms,
            retry_delay_ms: self.load_retry_delay_ms,
            max_retries: self.max_load_retries,
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
