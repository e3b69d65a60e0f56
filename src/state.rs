use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::resource::{Address, ObservedRecord, ResourceSettings, ResourceType};

/// Current on-disk format version
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Everything converge remembers between invocations
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConvergeState {
    pub version: u32,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Managed resources keyed by address (`volume.mysql`, `job.web`)
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

/// Stored state of one managed resource
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResourceState {
    pub resource_type: ResourceType,

    /// Raw spec text as last applied
    pub spec: String,

    #[serde(default)]
    pub settings: ResourceSettings,

    /// What the cluster reported after the last apply or refresh
    pub observed: ObservedRecord,
}

impl Default for ConvergeState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl ConvergeState {
    /// Load state from disk, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            anyhow::bail!(
                "State file {} has version {}, this build understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} resource(s) from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk, stamping `last_updated`
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn get(&self, address: &Address) -> Option<&ResourceState> {
        self.resources.get(&address.to_string())
    }

    pub fn upsert(&mut self, address: &Address, resource: ResourceState) {
        self.resources.insert(address.to_string(), resource);
    }

    /// Forget a resource, returning what was stored
    pub fn remove(&mut self, address: &Address) -> Option<ResourceState> {
        self.resources.remove(&address.to_string())
    }

    /// All stored addresses, skipping keys that no longer parse
    pub fn addresses(&self) -> Vec<Address> {
        self.resources
            .keys()
            .filter_map(|key| match key.parse() {
                Ok(address) => Some(address),
                Err(e) => {
                    log::warn!("Ignoring state entry '{key}': {e}");
                    None
                }
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
