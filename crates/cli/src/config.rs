//! CLI configuration
//!
//! Read from `wgprov.toml` in the data directory (or `--config`). Every
//! field is optional in the file; command-line flags win over file values.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wgprov_common::RenderOptions;

/// Settings file name inside the data directory
pub const SETTINGS_FILE: &str = "wgprov.toml";

/// Tool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path or name of the `wg` binary
    pub wg_binary: PathBuf,

    /// Bound on each `wg` invocation
    pub keygen_timeout_secs: u64,

    /// DNS server for wg-quick clients; empty disables the DNS line
    pub dns: String,

    /// PersistentKeepalive in seconds
    pub keepalive: u16,

    /// Prefix length of the client interface address
    pub client_prefix: u8,

    /// Write a PNG QR code next to the client config
    pub qr_png: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let render = RenderOptions::default();
        Self {
            wg_binary: PathBuf::from("wg"),
            keygen_timeout_secs: 10,
            dns: render.dns.unwrap_or_default(),
            keepalive: render.keepalive,
            client_prefix: render.client_prefix,
            qr_png: true,
        }
    }
}

impl Settings {
    /// Load settings from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            let settings: Self = toml::from_str(&content)
                .with_context(|| format!("Invalid settings file {:?}", path))?;
            Ok(settings)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn keygen_timeout(&self) -> Duration {
        Duration::from_secs(self.keygen_timeout_secs.max(1))
    }

    pub fn render_options(&self) -> RenderOptions {
        let dns = self.dns.trim();
        RenderOptions {
            dns: (!dns.is_empty()).then(|| dns.to_string()),
            keepalive: self.keepalive,
            client_prefix: self.client_prefix,
        }
    }
}

/// Settings path used when `--config` is not given
pub fn default_settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}
