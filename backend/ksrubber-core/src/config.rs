// src/config.rs

use serde::Deserialize;
use std::time::Duration;

use crate::ksrubber_client::{ClientConfig, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS};

pub const ENV_PREFIX: &str = "KSRUBBER_";
pub const DEFAULT_BANNER_SECS: u64 = 3;
pub const DEFAULT_DIES_PER_PAGE: usize = 20;

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_banner_secs() -> u64 {
    DEFAULT_BANNER_SECS
}

fn default_dies_per_page() -> usize {
    DEFAULT_DIES_PER_PAGE
}

/// Read from `KSRUBBER_*` environment variables, e.g. `KSRUBBER_API_BASE_URL`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KsRubberConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// How long a submit confirmation or error stays up before the form resets.
    #[serde(default = "default_banner_secs")]
    pub banner_secs: u64,
    #[serde(default = "default_dies_per_page")]
    pub dies_per_page: usize,
}

impl Default for KsRubberConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
            banner_secs: default_banner_secs(),
            dies_per_page: default_dies_per_page(),
        }
    }
}

impl KsRubberConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env::<KsRubberConfig>()
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_base_url.clone(),
            timeout_secs: self.http_timeout_secs,
        }
    }

    pub fn banner_window(&self) -> Duration {
        Duration::from_secs(self.banner_secs)
    }
}
