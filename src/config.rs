use anyhow::{Context, Result};
use declarative::WaitOptions;
use nomad_api::ClientConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::resource::ResourceSettings;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("converge"))
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub resource: ResourceSettings,
    pub wait: WaitConfig,
    /// Where managed resources are recorded, tilde expanded
    pub state_path: Option<String>,
}

/// How to reach the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub address: String,
    pub region: Option<String>,
    pub secret_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:4646".to_string(),
            region: None,
            secret_id: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub timeout_secs: u64,
    /// Return right after registering a job instead of following its deployment
    pub detach: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 1,
            max_interval_secs: 10,
            timeout_secs: 300,
            detach: false,
        }
    }
}

impl Config {
    /// Load `config.toml` from `path`, or the default location.
    ///
    /// A missing file at the default location yields the defaults; a
    /// missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_dir()?.join("config.toml"), false),
        };

        let mut config = if !explicit && !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            Self::default()
        } else {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("Invalid config format in {}", path.display()))?;
            log::debug!("Loaded config from {}", path.display());
            config
        };

        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reject polling settings that would hammer the cluster
    pub fn validate(&self) -> Result<()> {
        let wait = &self.wait;
        if wait.min_interval_secs == 0 {
            anyhow::bail!("wait.min_interval_secs must be at least 1");
        }
        if wait.max_interval_secs < wait.min_interval_secs {
            anyhow::bail!(
                "wait.max_interval_secs ({}) is below wait.min_interval_secs ({})",
                wait.max_interval_secs,
                wait.min_interval_secs
            );
        }
        Ok(())
    }

    /// Let `NOMAD_ADDR`, `NOMAD_REGION` and `NOMAD_TOKEN` override the file
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(address) = non_empty("NOMAD_ADDR") {
            log::debug!("Using NOMAD_ADDR={address}");
            self.provider.address = address;
        }
        if let Some(region) = non_empty("NOMAD_REGION") {
            self.provider.region = Some(region);
        }
        if let Some(token) = non_empty("NOMAD_TOKEN") {
            self.provider.secret_id = Some(token);
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            address: self.provider.address.trim_end_matches('/').to_string(),
            region: self.provider.region.clone(),
            token: self.provider.secret_id.clone(),
            timeout: Duration::from_secs(self.provider.timeout_secs),
        }
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            min_interval: Duration::from_secs(self.wait.min_interval_secs),
            max_interval: Duration::from_secs(self.wait.max_interval_secs),
            timeout: Duration::from_secs(self.wait.timeout_secs),
            ..WaitOptions::default()
        }
    }

    /// Get expanded state file path
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_path {
            Some(raw) => {
                let expanded = shellexpand::tilde(raw);
                Ok(PathBuf::from(expanded.as_ref()))
            }
            None => {
                let home = dirs::home_dir().context("Could not determine home directory")?;
                Ok(home
                    .join(".local")
                    .join("state")
                    .join("converge")
                    .join("state.json"))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
