//! Command implementations
//!
//! Each command has a `run` entry point that loads config and state, and a
//! core function that works on an explicit client and state so it can be
//! exercised against a mock cluster.

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod refresh;
pub mod show;
pub mod validate;
pub mod volume;

use anyhow::{Context as AnyhowContext, Result};
use declarative::ConfirmCallback;
use nomad_api::Client;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Context;
use crate::config::Config;
use crate::resource::ResourceSettings;
use crate::state::ConvergeState;

/// Loaded config, cluster client and state for one invocation
pub struct Session {
    pub config: Config,
    pub client: Client,
    pub state: ConvergeState,
    state_path: PathBuf,
}

impl Session {
    pub fn open(ctx: &Context) -> Result<Self> {
        let config = Config::load(ctx.config.as_deref())?;
        let state_path = config.state_path()?;
        let state = ConvergeState::load(&state_path)?;
        let client = Client::new(&config.client_config());
        log::debug!("Using cluster at {}", config.provider.address);

        Ok(Self {
            config,
            client,
            state,
            state_path,
        })
    }

    pub fn save(&mut self) -> Result<()> {
        self.state.save(&self.state_path)
    }
}

/// Read a spec file as text
pub fn read_spec(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Could not read spec {}", path.display()))
}

/// Resource settings from config defaults, overridden by flags
pub fn resolve_settings(
    defaults: &ResourceSettings,
    json: bool,
    no_deregister_on_destroy: bool,
    no_deregister_on_id_change: bool,
    purge_on_destroy: bool,
) -> ResourceSettings {
    ResourceSettings {
        json: defaults.json || json,
        deregister_on_destroy: defaults.deregister_on_destroy && !no_deregister_on_destroy,
        deregister_on_id_change: defaults.deregister_on_id_change && !no_deregister_on_id_change,
        purge_on_destroy: defaults.purge_on_destroy || purge_on_destroy,
    }
}

/// Confirmation prompt on the terminal
pub struct TerminalConfirm;

impl ConfirmCallback for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }
}

/// Pick the confirmation strategy for `--yes`
pub fn confirmer(yes: bool) -> Box<dyn ConfirmCallback> {
    if yes {
        Box::new(declarative::AutoConfirm)
    } else {
        Box::new(TerminalConfirm)
    }
}
