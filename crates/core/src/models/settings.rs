use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;

pub const DEFAULT_API_BASE_URL: &str = "https://expense-tracker-api-tvk5.onrender.com/api/";

/// Client configuration. Every field has a default, so a partial JSON file
/// only needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the remote API, with trailing slash.
    pub api_base_url: String,

    /// TCP connect budget for API calls.
    pub connect_timeout_secs: u64,

    /// Whole-request (read + write) budget for API calls.
    pub request_timeout_secs: u64,

    /// How long a fetched feed counts as fresh.
    pub cache_window_secs: u64,

    /// Display label of the conversion base currency.
    pub base_currency: String,

    /// Display label of the conversion target currency.
    pub target_currency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout_secs: 30,
            request_timeout_secs: 30,
            cache_window_secs: 300,
            base_currency: "USD".to_string(),
            target_currency: "LBP".to_string(),
        }
    }
}

impl Settings {
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.api_base_url.trim().is_empty() {
            return Err(CoreError::ValidationError("api_base_url must not be empty".into()));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(CoreError::ValidationError("timeouts must be at least one second".into()));
        }
        if self.cache_window_secs == 0 {
            return Err(CoreError::ValidationError("cache_window_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_window_secs as i64)
    }
}
