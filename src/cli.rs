use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::resource::{Address, ResourceType};

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile Nomad volume and job specs onto a cluster", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/converge/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what applying a spec would change
    Plan(PlanArgs),

    /// Apply a spec to the cluster
    Apply(ApplyArgs),

    /// Deregister a managed resource and forget it
    Destroy(DestroyArgs),

    /// Re-read managed resources from the cluster
    Refresh {
        /// Only refresh this resource (e.g. volume.mysql)
        address: Option<Address>,
    },

    /// Show managed resources as last observed
    Show {
        /// Only show this resource (e.g. job.web)
        address: Option<Address>,
    },

    /// Look up a CSI volume that converge does not manage
    Volume(VolumeArgs),

    /// Parse a spec and print it in canonical form
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Spec Arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct SpecArgs {
    /// Kind of resource the spec describes
    #[arg(value_enum)]
    pub resource_type: ResourceType,

    /// Name the resource is managed under
    pub name: String,

    /// Spec file
    #[arg(short, long, value_name = "FILE")]
    pub spec: PathBuf,

    /// Spec is Nomad API JSON instead of the native format
    #[arg(long)]
    pub json: bool,
}

impl SpecArgs {
    pub fn address(&self) -> Address {
        Address::new(self.resource_type, self.name.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Kind of resource the spec describes
    #[arg(value_enum)]
    pub resource_type: ResourceType,

    /// Name the resource is managed under
    pub name: String,

    /// Spec file; without one, the spec is treated as not known yet
    #[arg(short, long, value_name = "FILE")]
    pub spec: Option<PathBuf>,

    /// Spec is Nomad API JSON instead of the native format
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn address(&self) -> Address {
        Address::new(self.resource_type, self.name.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Do not wait for the job's deployment to finish
    #[arg(long)]
    pub detach: bool,

    /// Show what would change without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Leave the object registered when the resource is destroyed
    #[arg(long)]
    pub no_deregister_on_destroy: bool,

    /// Rename in place instead of replacing when the id changes
    #[arg(long)]
    pub no_deregister_on_id_change: bool,

    /// Purge the job from the cluster when it is destroyed
    #[arg(long)]
    pub purge_on_destroy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DestroyArgs {
    /// Resource to destroy (e.g. job.web)
    pub address: Address,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct VolumeArgs {
    /// Volume id
    pub id: String,

    /// Namespace to look in
    #[arg(short, long, default_value = "default")]
    pub namespace: String,

    /// Print the volume as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Kind of resource the spec describes
    #[arg(value_enum)]
    pub resource_type: ResourceType,

    /// Spec file
    #[arg(short, long, value_name = "FILE")]
    pub spec: PathBuf,

    /// Spec is Nomad API JSON instead of the native format
    #[arg(long)]
    pub json: bool,
}
