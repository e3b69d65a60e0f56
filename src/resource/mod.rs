//! Resource kinds managed by converge
//!
//! Each kind pairs a spec record type with the remote calls that register,
//! read and deregister it, and knows which of its attributes the cluster
//! assigns.

pub mod csi_volume;
pub mod job;

pub use csi_volume::CsiVolumeKind;
pub use job::JobKind;

use clap::ValueEnum;
use declarative::{AttrValue, Identity};
use jobspec::SpecRecord;
use nomad_api::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// CSI volume
    Volume,
    /// Job
    Job,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State file key of a resource: `<type>.<name>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    pub resource_type: ResourceType,
    pub name: String,
}

impl Address {
    pub fn new(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('.')
            .ok_or_else(|| format!("Invalid address '{s}': expected <type>.<name>"))?;
        if name.is_empty() {
            return Err(format!("Invalid address '{s}': empty name"));
        }
        let resource_type = <ResourceType as ValueEnum>::from_str(kind, true)
            .map_err(|_| format!("Unknown resource type '{kind}' (expected volume or job)"))?;
        Ok(Self::new(resource_type, name))
    }
}

/// Observable attributes tracked in plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Id,
    Name,
    Namespace,
    Type,
    ModifyIndex,
    ExternalId,
    PluginId,
    AccessMode,
    AttachmentMode,
    MountOptions,
    Region,
    AllocationIds,
    DeploymentId,
    DeploymentStatus,
}

impl Attribute {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Namespace => "namespace",
            Self::Type => "type",
            Self::ModifyIndex => "modify_index",
            Self::ExternalId => "external_id",
            Self::PluginId => "plugin_id",
            Self::AccessMode => "access_mode",
            Self::AttachmentMode => "attachment_mode",
            Self::MountOptions => "mount_options",
            Self::Region => "region",
            Self::AllocationIds => "allocation_ids",
            Self::DeploymentId => "deployment_id",
            Self::DeploymentStatus => "deployment_status",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-resource behaviour flags, stored alongside the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Spec is Nomad API JSON instead of the native format
    #[serde(default)]
    pub json: bool,
    /// Deregister from the cluster on destroy
    #[serde(default = "default_true")]
    pub deregister_on_destroy: bool,
    /// Replace instead of renaming in place when the id changes
    #[serde(default = "default_true")]
    pub deregister_on_id_change: bool,
    /// Purge jobs from the cluster on destroy
    #[serde(default)]
    pub purge_on_destroy: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            json: false,
            deregister_on_destroy: true,
            deregister_on_id_change: true,
            purge_on_destroy: false,
        }
    }
}

/// Last-known remote state of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRecord {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub modify_index: u64,
    pub create_index: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allocation_ids: Vec<String>,
    pub details: Details,
}

/// Kind-specific observed attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Details {
    Volume {
        external_id: String,
        plugin_id: String,
        access_mode: String,
        attachment_mode: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mount_options: Option<String>,
    },
    Job {
        job_type: String,
        region: String,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deployment_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deployment_status: Option<String>,
    },
}

impl ObservedRecord {
    /// Remote identity
    pub fn identity(&self) -> Identity {
        Identity::new(self.namespace.clone(), self.id.clone())
    }

    /// Attribute values used as the "old" side of a plan
    pub fn attributes(&self) -> Vec<(Attribute, AttrValue)> {
        let mut attrs = vec![
            (Attribute::Id, AttrValue::from(self.id.as_str())),
            (Attribute::Name, AttrValue::from(self.name.as_str())),
            (Attribute::Namespace, AttrValue::from(self.namespace.as_str())),
            (Attribute::ModifyIndex, AttrValue::Int(self.modify_index)),
            (
                Attribute::AllocationIds,
                AttrValue::List(self.allocation_ids.clone()),
            ),
        ];

        match &self.details {
            Details::Volume {
                external_id,
                plugin_id,
                access_mode,
                attachment_mode,
                mount_options,
            } => {
                attrs.push((Attribute::Type, AttrValue::from("csi")));
                attrs.push((Attribute::ExternalId, AttrValue::from(external_id.as_str())));
                attrs.push((Attribute::PluginId, AttrValue::from(plugin_id.as_str())));
                attrs.push((Attribute::AccessMode, AttrValue::from(access_mode.as_str())));
                attrs.push((
                    Attribute::AttachmentMode,
                    AttrValue::from(attachment_mode.as_str()),
                ));
                if let Some(mount) = mount_options {
                    attrs.push((Attribute::MountOptions, AttrValue::from(mount.as_str())));
                }
            }
            Details::Job {
                job_type,
                region,
                deployment_id,
                deployment_status,
                ..
            } => {
                attrs.push((Attribute::Type, AttrValue::from(job_type.as_str())));
                attrs.push((Attribute::Region, AttrValue::from(region.as_str())));
                if let Some(id) = deployment_id {
                    attrs.push((Attribute::DeploymentId, AttrValue::from(id.as_str())));
                }
                if let Some(status) = deployment_status {
                    attrs.push((Attribute::DeploymentStatus, AttrValue::from(status.as_str())));
                }
            }
        }
        attrs
    }

    /// Keep deployment fields from an earlier observation when a fresh read
    /// has none.
    pub fn carry_deployment(&mut self, prior: &Self) {
        if let (
            Details::Job {
                deployment_id,
                deployment_status,
                ..
            },
            Details::Job {
                deployment_id: prior_id,
                deployment_status: prior_status,
                ..
            },
        ) = (&mut self.details, &prior.details)
        {
            if deployment_id.is_none() {
                deployment_id.clone_from(prior_id);
                deployment_status.clone_from(prior_status);
            }
        }
    }

    /// Record the deployment a job apply ended with
    pub fn set_deployment(&mut self, id: &str, status: &str) {
        if let Details::Job {
            deployment_id,
            deployment_status,
            ..
        } = &mut self.details
        {
            *deployment_id = Some(id.to_string());
            *deployment_status = Some(status.to_string());
        }
    }
}

/// A kind of resource the engine can reconcile
pub trait ResourceKind {
    type Record: SpecRecord;

    const TYPE: ResourceType;

    /// Attributes staged as computed when the desired spec is not known yet
    const COMPUTED: &'static [Attribute];

    /// Register the record, returning the evaluation id to monitor, if any
    fn register(
        client: &Client,
        record: &Self::Record,
        namespace: &str,
    ) -> nomad_api::Result<Option<String>>;

    /// Read the remote object
    fn read(client: &Client, identity: &Identity) -> nomad_api::Result<ObservedRecord>;

    /// Remove the remote object
    fn deregister(
        client: &Client,
        identity: &Identity,
        settings: &ResourceSettings,
    ) -> nomad_api::Result<()>;
}
