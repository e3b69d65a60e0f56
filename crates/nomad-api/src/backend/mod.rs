//! Backend trait and implementations for reaching a Nomad cluster.
//!
//! [`http::HttpBackend`] talks to a real cluster. [`MockBackend`] keeps
//! everything in memory, records every call and lets tests script
//! evaluations, deployments and failures:
//!
//! ```
//! use nomad_api::backend::{Backend, MockBackend};
//! use nomad_api::CsiVolume;
//!
//! let mock = MockBackend::new();
//! let volume = CsiVolume {
//!     id: "mysql".to_string(),
//!     plugin_id: "aws-ebs0".to_string(),
//!     ..Default::default()
//! };
//! mock.register_volume(&volume, "default").unwrap();
//!
//! let stored = mock.volume_info("mysql", "default").unwrap();
//! assert_eq!(stored.plugin_id, "aws-ebs0");
//! assert_eq!(mock.calls().len(), 2);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    AllocationStub, CsiVolume, Deployment, Evaluation, Job, JobRegisterResponse,
    namespace_or_default, status,
};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations a Nomad cluster offers to the reconciler.
///
/// Every call is blocking and performs exactly one request.
pub trait Backend: Send + Sync {
    /// Create or update a CSI volume registration.
    fn register_volume(&self, volume: &CsiVolume, namespace: &str) -> Result<()>;

    /// Remove a CSI volume registration.
    fn deregister_volume(&self, id: &str, namespace: &str) -> Result<()>;

    /// Read a CSI volume.
    ///
    /// # Errors
    ///
    /// Returns a 404 `Error::Status` if the volume does not exist.
    fn volume_info(&self, id: &str, namespace: &str) -> Result<CsiVolume>;

    /// Create or update a job. The response names the evaluation it triggered.
    fn register_job(&self, job: &Job, namespace: &str) -> Result<JobRegisterResponse>;

    /// Stop a job, optionally purging it. Returns the evaluation id.
    fn deregister_job(&self, id: &str, namespace: &str, purge: bool) -> Result<String>;

    /// Read a job.
    fn job_info(&self, id: &str, namespace: &str) -> Result<Job>;

    /// List the allocations of a job.
    fn job_allocations(&self, id: &str, namespace: &str) -> Result<Vec<AllocationStub>>;

    /// Read an evaluation.
    fn evaluation_info(&self, id: &str) -> Result<Evaluation>;

    /// Read a deployment.
    fn deployment_info(&self, id: &str) -> Result<Deployment>;
}

/// Backend operations, used to record calls and inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RegisterVolume,
    DeregisterVolume,
    VolumeInfo,
    RegisterJob,
    DeregisterJob,
    JobInfo,
    JobAllocations,
    EvaluationInfo,
    DeploymentInfo,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RegisterVolume => "register_volume",
            Self::DeregisterVolume => "deregister_volume",
            Self::VolumeInfo => "volume_info",
            Self::RegisterJob => "register_job",
            Self::DeregisterJob => "deregister_job",
            Self::JobInfo => "job_info",
            Self::JobAllocations => "job_allocations",
            Self::EvaluationInfo => "evaluation_info",
            Self::DeploymentInfo => "deployment_info",
        };
        f.write_str(name)
    }
}

/// A call recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub target: String,
    pub namespace: Option<String>,
}

type Key = (String, String);

fn key(namespace: &str, id: &str) -> Key {
    (namespace_or_default(namespace).to_string(), id.to_string())
}

#[derive(Debug, Default)]
struct MockState {
    volumes: HashMap<Key, CsiVolume>,
    jobs: HashMap<Key, Job>,
    allocations: HashMap<Key, Vec<AllocationStub>>,
    evaluations: HashMap<String, VecDeque<Evaluation>>,
    deployments: HashMap<String, VecDeque<Deployment>>,
    failures: HashMap<Operation, Error>,
    next_eval_ids: VecDeque<String>,
    calls: Vec<Call>,
    index: u64,
}

impl MockState {
    fn record(&mut self, operation: Operation, target: &str, namespace: Option<&str>) -> Result<()> {
        self.calls.push(Call {
            operation,
            target: target.to_string(),
            namespace: namespace.map(str::to_string),
        });
        match self.failures.get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn bump(&mut self) -> u64 {
        self.index += 1;
        self.index
    }

    fn next_eval_id(&mut self) -> String {
        self.next_eval_ids
            .pop_front()
            .unwrap_or_else(|| format!("eval-{}", self.index))
    }
}

/// Pop scripted responses in order, repeating the last one forever.
fn advance<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

/// In-memory backend for testing without a cluster.
///
/// Clones share state, so a test can hand one clone to a client and inspect
/// the other.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a volume as if it had been registered.
    pub fn insert_volume(&self, volume: CsiVolume) {
        let mut state = self.lock();
        state
            .volumes
            .insert(key(&volume.namespace, &volume.id), volume);
    }

    /// Store a job as if it had been registered.
    pub fn insert_job(&self, job: Job) {
        let mut state = self.lock();
        state.jobs.insert(key(&job.namespace, &job.id), job);
    }

    /// Set the allocations reported for a job.
    pub fn set_job_allocations(&self, namespace: &str, id: &str, allocations: Vec<AllocationStub>) {
        self.lock().allocations.insert(key(namespace, id), allocations);
    }

    /// Queue a response for an evaluation id.
    ///
    /// Successive reads return queued responses in order; the last one is
    /// returned from then on.
    pub fn push_evaluation(&self, evaluation: Evaluation) {
        self.lock()
            .evaluations
            .entry(evaluation.id.clone())
            .or_default()
            .push_back(evaluation);
    }

    /// Queue a response for a deployment id, like [`Self::push_evaluation`].
    pub fn push_deployment(&self, deployment: Deployment) {
        self.lock()
            .deployments
            .entry(deployment.id.clone())
            .or_default()
            .push_back(deployment);
    }

    /// Make the next job registration report this evaluation id.
    pub fn queue_eval_id(&self, id: impl Into<String>) {
        self.lock().next_eval_ids.push_back(id.into());
    }

    /// Make every call of `operation` fail with `error`.
    pub fn fail(&self, operation: Operation, error: Error) {
        self.lock().failures.insert(operation, error);
    }

    /// Stop failing `operation`.
    pub fn clear_failure(&self, operation: Operation) {
        self.lock().failures.remove(&operation);
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls of one operation made so far.
    pub fn calls_of(&self, operation: Operation) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    /// Whether a volume is currently registered.
    pub fn has_volume(&self, namespace: &str, id: &str) -> bool {
        self.lock().volumes.contains_key(&key(namespace, id))
    }

    /// Whether a job is currently registered.
    pub fn has_job(&self, namespace: &str, id: &str) -> bool {
        self.lock().jobs.contains_key(&key(namespace, id))
    }
}

impl Backend for MockBackend {
    fn register_volume(&self, volume: &CsiVolume, namespace: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Operation::RegisterVolume, &volume.id, Some(namespace))?;

        let k = key(namespace, &volume.id);
        let index = state.bump();
        let create_index = state.volumes.get(&k).map_or(index, |v| v.create_index);

        let mut stored = volume.clone();
        stored.namespace = k.0.clone();
        if stored.name.is_empty() {
            stored.name = stored.id.clone();
        }
        stored.create_index = create_index;
        stored.modify_index = index;
        stored.schedulable = true;
        state.volumes.insert(k, stored);
        Ok(())
    }

    fn deregister_volume(&self, id: &str, namespace: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Operation::DeregisterVolume, id, Some(namespace))?;
        match state.volumes.remove(&key(namespace, id)) {
            Some(_) => Ok(()),
            None => Err(Error::not_found("volume not found")),
        }
    }

    fn volume_info(&self, id: &str, namespace: &str) -> Result<CsiVolume> {
        let mut state = self.lock();
        state.record(Operation::VolumeInfo, id, Some(namespace))?;
        state
            .volumes
            .get(&key(namespace, id))
            .cloned()
            .ok_or_else(|| Error::not_found("volume not found"))
    }

    fn register_job(&self, job: &Job, namespace: &str) -> Result<JobRegisterResponse> {
        let mut state = self.lock();
        state.record(Operation::RegisterJob, &job.id, Some(namespace))?;

        let k = key(namespace, &job.id);
        let index = state.bump();
        let create_index = state.jobs.get(&k).map_or(index, |j| j.create_index);

        let mut stored = job.clone();
        stored.namespace = k.0.clone();
        if stored.name.is_empty() {
            stored.name = stored.id.clone();
        }
        stored.status = Some("pending".to_string());
        stored.create_index = create_index;
        stored.modify_index = index;
        stored.job_modify_index = index;
        state.jobs.insert(k, stored);

        let eval_id = state.next_eval_id();
        state
            .evaluations
            .entry(eval_id.clone())
            .or_insert_with(|| {
                VecDeque::from([Evaluation {
                    id: eval_id.clone(),
                    job_id: job.id.clone(),
                    status: status::EVAL_COMPLETE.to_string(),
                    ..Default::default()
                }])
            });

        Ok(JobRegisterResponse {
            eval_id,
            eval_create_index: index,
            job_modify_index: index,
            warnings: String::new(),
        })
    }

    fn deregister_job(&self, id: &str, namespace: &str, purge: bool) -> Result<String> {
        let mut state = self.lock();
        state.record(Operation::DeregisterJob, id, Some(namespace))?;

        let k = key(namespace, id);
        let index = state.bump();
        if purge {
            if state.jobs.remove(&k).is_none() {
                return Err(Error::not_found("job not found"));
            }
        } else {
            match state.jobs.get_mut(&k) {
                Some(job) => {
                    job.status = Some("dead".to_string());
                    job.modify_index = index;
                }
                None => return Err(Error::not_found("job not found")),
            }
        }
        Ok(state.next_eval_id())
    }

    fn job_info(&self, id: &str, namespace: &str) -> Result<Job> {
        let mut state = self.lock();
        state.record(Operation::JobInfo, id, Some(namespace))?;
        state
            .jobs
            .get(&key(namespace, id))
            .cloned()
            .ok_or_else(|| Error::not_found("job not found"))
    }

    fn job_allocations(&self, id: &str, namespace: &str) -> Result<Vec<AllocationStub>> {
        let mut state = self.lock();
        state.record(Operation::JobAllocations, id, Some(namespace))?;
        Ok(state
            .allocations
            .get(&key(namespace, id))
            .cloned()
            .unwrap_or_default())
    }

    fn evaluation_info(&self, id: &str) -> Result<Evaluation> {
        let mut state = self.lock();
        state.record(Operation::EvaluationInfo, id, None)?;
        state
            .evaluations
            .get_mut(id)
            .and_then(advance)
            .ok_or_else(|| Error::not_found("eval not found"))
    }

    fn deployment_info(&self, id: &str) -> Result<Deployment> {
        let mut state = self.lock();
        state.record(Operation::DeploymentInfo, id, None)?;
        state
            .deployments
            .get_mut(id)
            .and_then(advance)
            .ok_or_else(|| Error::not_found("deployment not found"))
    }
}
