//! # nomad-api
//!
//! Blocking client for the parts of the Nomad HTTP API a reconciler needs:
//! CSI volume and job registration, lookups, evaluations and deployments.
//!
//! ## Example
//!
//! ```no_run
//! use nomad_api::{Client, ClientConfig};
//!
//! let client = Client::new(&ClientConfig::default());
//!
//! match client.volume_info("mysql", "default") {
//!     Ok(volume) => println!("{} is at index {}", volume.id, volume.modify_index),
//!     Err(e) if e.is_not_found() => println!("mysql is not registered"),
//!     Err(e) => eprintln!("lookup failed: {e}"),
//! }
//! ```
//!
//! ## Testing
//!
//! [`MockBackend`] implements [`backend::Backend`] in memory; hand a clone to
//! [`Client::with_backend`] and inspect the other clone afterwards.

pub mod backend;
pub mod error;
pub mod types;

pub use backend::{Backend, Call, MockBackend, Operation};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    AllocationStub, CsiMountOptions, CsiVolume, DEFAULT_NAMESPACE, Deployment, Evaluation, Job,
    JobRegisterResponse, Resources, Task, TaskGroup, namespace_or_default, status,
};

use backend::http::HttpBackend;
use std::time::Duration;

/// Connection settings for a Nomad cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base address, e.g. `http://127.0.0.1:4646`.
    pub address: String,
    /// Region to target; the agent's own region when unset.
    pub region: Option<String>,
    /// ACL token sent as `X-Nomad-Token`.
    pub token: Option<String>,
    /// Timeout applied to each request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:4646".to_string(),
            region: None,
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// High-level client for Nomad API operations.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client talking HTTP to the configured cluster.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            backend: Box::new(HttpBackend::new(config)),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    // =========================================================================
    // CSI volumes
    // =========================================================================

    /// Register (create or update) a CSI volume in a namespace.
    pub fn register_volume(&self, volume: &CsiVolume, namespace: &str) -> Result<()> {
        self.backend.register_volume(volume, namespace)
    }

    /// Deregister a CSI volume.
    pub fn deregister_volume(&self, id: &str, namespace: &str) -> Result<()> {
        self.backend.deregister_volume(id, namespace)
    }

    /// Read a CSI volume.
    pub fn volume_info(&self, id: &str, namespace: &str) -> Result<CsiVolume> {
        self.backend.volume_info(id, namespace)
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Register (create or update) a job in a namespace.
    pub fn register_job(&self, job: &Job, namespace: &str) -> Result<JobRegisterResponse> {
        self.backend.register_job(job, namespace)
    }

    /// Deregister a job, returning the evaluation id.
    pub fn deregister_job(&self, id: &str, namespace: &str, purge: bool) -> Result<String> {
        self.backend.deregister_job(id, namespace, purge)
    }

    /// Read a job.
    pub fn job_info(&self, id: &str, namespace: &str) -> Result<Job> {
        self.backend.job_info(id, namespace)
    }

    /// List a job's allocations.
    pub fn job_allocations(&self, id: &str, namespace: &str) -> Result<Vec<AllocationStub>> {
        self.backend.job_allocations(id, namespace)
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Read an evaluation.
    pub fn evaluation_info(&self, id: &str) -> Result<Evaluation> {
        self.backend.evaluation_info(id)
    }

    /// Read a deployment.
    pub fn deployment_info(&self, id: &str) -> Result<Deployment> {
        self.backend.deployment_info(id)
    }
}
