//! Run settings.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::host::ActionHost;
use crate::toolchain::archive::DEFAULT_DOWNLOAD_BASE;
use crate::toolchain::paths::default_cache_dir;
use crate::toolchain::types::{ToolKind, LATEST};

// =============================================================================
// Defaults
// =============================================================================

/// Default release metadata API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

pub const INPUT_WASM_PACK_VERSION: &str = "wasm-pack-version";
pub const INPUT_BINARYEN_VERSION: &str = "binaryen-version";
pub const INPUT_GITHUB_TOKEN: &str = "github-token";

const ENV_CACHE_DIR: &str = "WASM_TOOLCHAIN_CACHE_DIR";
const ENV_API_URL: &str = "WASM_TOOLCHAIN_API_URL";
const ENV_DOWNLOAD_URL: &str = "WASM_TOOLCHAIN_DOWNLOAD_URL";
const ENV_HTTP_TIMEOUT: &str = "WASM_TOOLCHAIN_HTTP_TIMEOUT";
const ENV_PARALLEL: &str = "WASM_TOOLCHAIN_PARALLEL";

const USER_AGENT: &str = concat!("wasm-toolchain/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Settings
// =============================================================================

/// Everything a run needs to know before it touches the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Requested wasm-pack version, or `latest`.
    pub wasm_pack_version: String,

    /// Requested binaryen version, or `latest`.
    pub binaryen_version: String,

    /// Persistent tool cache location.
    pub cache_dir: PathBuf,

    /// Base URL of the release metadata API.
    pub api_base_url: String,

    /// Base URL release assets are downloaded from.
    pub download_base_url: String,

    pub http_timeout_secs: u64,

    /// Install both tools concurrently instead of one after the other.
    #[serde(default)]
    pub parallel: bool,

    /// Sent as a bearer token on release metadata requests.
    #[serde(default, skip_serializing)]
    pub github_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wasm_pack_version: LATEST.to_string(),
            binaryen_version: LATEST.to_string(),
            cache_dir: default_cache_dir(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            download_base_url: DEFAULT_DOWNLOAD_BASE.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            parallel: false,
            github_token: None,
        }
    }
}

impl Settings {
    /// Builds settings from host inputs and the process environment.
    pub fn from_host(host: &dyn ActionHost) -> Self {
        let mut settings = Self::default();
        settings.apply_inputs(host);
        settings.apply_overrides(|name| std::env::var(name).ok());
        settings
    }

    /// Reads version and token inputs. Empty inputs keep the defaults.
    pub fn apply_inputs(&mut self, host: &dyn ActionHost) {
        let input = |name: &str| {
            host.get_input(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = input(INPUT_WASM_PACK_VERSION) {
            self.wasm_pack_version = v;
        }
        if let Some(v) = input(INPUT_BINARYEN_VERSION) {
            self.binaryen_version = v;
        }
        if let Some(token) = input(INPUT_GITHUB_TOKEN) {
            self.github_token = Some(token);
        }
    }

    /// Applies environment overrides, looking variables up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = var(ENV_CACHE_DIR) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(url) = var(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = var(ENV_DOWNLOAD_URL) {
            self.download_base_url = url;
        }
        if let Some(raw) = var(ENV_HTTP_TIMEOUT) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.http_timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "Ignoring invalid {}", ENV_HTTP_TIMEOUT),
            }
        }
        if let Some(raw) = var(ENV_PARALLEL) {
            self.parallel = matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Requested version for `tool`.
    pub fn requested_version(&self, tool: ToolKind) -> &str {
        match tool {
            ToolKind::WasmPack => &self.wasm_pack_version,
            ToolKind::Binaryen => &self.binaryen_version,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Builds the HTTP client shared by every request of a run.
    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")
    }
}
