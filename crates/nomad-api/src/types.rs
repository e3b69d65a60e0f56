//! Wire types for the Nomad HTTP API.
//!
//! Field names follow the API's PascalCase JSON. Collections that the
//! server may send as `null` decode to their empty value.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Status strings reported by evaluations and deployments.
pub mod status {
    /// Evaluation finished scheduling.
    pub const EVAL_COMPLETE: &str = "complete";
    /// Evaluation failed.
    pub const EVAL_FAILED: &str = "failed";
    /// Evaluation was cancelled (the server spells it with one `l`).
    pub const EVAL_CANCELED: &str = "canceled";
    /// Deployment is still rolling out.
    pub const DEPLOYMENT_RUNNING: &str = "running";
    /// Deployment finished successfully.
    pub const DEPLOYMENT_SUCCESSFUL: &str = "successful";
    /// Deployment failed.
    pub const DEPLOYMENT_FAILED: &str = "failed";
    /// Deployment was cancelled.
    pub const DEPLOYMENT_CANCELLED: &str = "cancelled";
    /// Deployment is paused.
    pub const DEPLOYMENT_PAUSED: &str = "paused";
}

/// Return `namespace`, or the default namespace when it is empty.
pub fn namespace_or_default(namespace: &str) -> &str {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE
    } else {
        namespace
    }
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// CSI volumes
// =============================================================================

/// A CSI volume as registered with Nomad.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CsiVolume {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(rename = "ExternalID", default)]
    pub external_id: String,
    #[serde(rename = "PluginID", default)]
    pub plugin_id: String,
    #[serde(default)]
    pub access_mode: String,
    #[serde(default)]
    pub attachment_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_options: Option<CsiMountOptions>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub secrets: BTreeMap<String, String>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub parameters: BTreeMap<String, String>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub context: BTreeMap<String, String>,
    #[serde(
        rename = "RequestedCapacityMin",
        alias = "CapacityMin",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub capacity_min: Option<u64>,
    #[serde(
        rename = "RequestedCapacityMax",
        alias = "CapacityMax",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub capacity_max: Option<u64>,

    // Server-populated
    #[serde(default)]
    pub schedulable: bool,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub allocations: Vec<AllocationStub>,
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
}

/// Mount options requested for a CSI volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CsiMountOptions {
    #[serde(rename = "FSType", default)]
    pub fs_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub mount_flags: Vec<String>,
}

impl CsiMountOptions {
    /// Whether no option is set.
    pub fn is_empty(&self) -> bool {
        self.fs_type.is_empty() && self.mount_flags.is_empty()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CsiVolumeRegisterRequest<'a> {
    pub volumes: [&'a CsiVolume; 1],
}

// =============================================================================
// Jobs
// =============================================================================

/// A Nomad job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub datacenters: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub meta: BTreeMap<String, String>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub task_groups: Vec<TaskGroup>,

    // Server-populated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
    #[serde(default)]
    pub job_modify_index: u64,
}

/// A group of tasks scheduled together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tasks: Vec<Task>,
}

/// A single task in a task group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
}

/// Resources requested by a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(rename = "CPU", default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(rename = "MemoryMB", default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct JobRegisterRequest<'a> {
    pub job: &'a Job,
}

/// Response to a job registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRegisterResponse {
    #[serde(rename = "EvalID", default)]
    pub eval_id: String,
    #[serde(default)]
    pub eval_create_index: u64,
    #[serde(default)]
    pub job_modify_index: u64,
    #[serde(default)]
    pub warnings: String,
}

/// Response to a job deregistration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobDeregisterResponse {
    #[serde(rename = "EvalID", default)]
    pub eval_id: String,
}

/// Short form of an allocation, as listed for jobs and volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AllocationStub {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub client_status: String,
}

// =============================================================================
// Evaluations and deployments
// =============================================================================

/// A scheduling evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Evaluation {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "JobID", default)]
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_description: String,
    #[serde(default)]
    pub next_eval: String,
    #[serde(rename = "DeploymentID", default)]
    pub deployment_id: String,
}

/// A job deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deployment {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "JobID", default)]
    pub job_id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_description: String,
}
