//! CLI configuration, parsed from a TOML file plus environment overrides.
//!
//! Priority: environment variables > config file > defaults. A missing
//! config file is not an error.

use anyhow::{Context, Result};
use dntkey_vault::settings::MAX_AUTO_LOCK_MINUTES;
use dntkey_vault::Settings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DntkeyConfig {
    #[serde(default)]
    pub wallet: WalletSection,

    /// Initial values for the persisted wallet settings
    #[serde(default)]
    pub defaults: DefaultsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    /// Directory holding the wallet database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsSection {
    #[serde(default = "default_rpc_endpoint")]
    pub rpc_endpoint: String,

    #[serde(default = "default_auto_lock_minutes")]
    pub auto_lock_minutes: u32,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            rpc_endpoint: default_rpc_endpoint(),
            auto_lock_minutes: default_auto_lock_minutes(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".dntkey"),
        None => PathBuf::from(".dntkey"),
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_rpc_endpoint() -> String {
    Settings::default().rpc_endpoint
}

fn default_auto_lock_minutes() -> u32 {
    Settings::default().auto_lock_minutes
}

impl DntkeyConfig {
    /// Load from `path`, or defaults if the file does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DntkeyConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// - `DNTKEY_DATA_DIR`
    /// - `DNTKEY_LOG_LEVEL`
    /// - `DNTKEY_RPC_ENDPOINT`
    /// - `DNTKEY_AUTO_LOCK_MINUTES`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DNTKEY_DATA_DIR") {
            self.wallet.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DNTKEY_LOG_LEVEL") {
            self.wallet.log_level = v;
        }
        if let Ok(v) = std::env::var("DNTKEY_RPC_ENDPOINT") {
            self.defaults.rpc_endpoint = v;
        }
        if let Ok(v) = std::env::var("DNTKEY_AUTO_LOCK_MINUTES") {
            if let Ok(minutes) = v.parse::<u32>() {
                self.defaults.auto_lock_minutes = minutes;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..=MAX_AUTO_LOCK_MINUTES).contains(&self.defaults.auto_lock_minutes),
            "defaults.auto_lock_minutes must be between 1 and {}",
            MAX_AUTO_LOCK_MINUTES
        );

        let endpoint = &self.defaults.rpc_endpoint;
        anyhow::ensure!(!endpoint.is_empty(), "defaults.rpc_endpoint must not be empty");
        anyhow::ensure!(
            endpoint.starts_with("http://") || endpoint.starts_with("https://"),
            "defaults.rpc_endpoint must start with http:// or https://"
        );

        anyhow::ensure!(
            !self.wallet.data_dir.as_os_str().is_empty(),
            "wallet.data_dir must not be empty"
        );
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.wallet.data_dir.join("wallet.db")
    }

    /// Settings used until the user saves their own.
    pub fn settings_defaults(&self) -> Settings {
        Settings {
            rpc_endpoint: self.defaults.rpc_endpoint.clone(),
            auto_lock_minutes: self.defaults.auto_lock_minutes,
        }
    }
}
