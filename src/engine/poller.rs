//! Polling - follow a job's evaluation chain until it settles
//!
//! Registering a job creates an evaluation. An evaluation may hand over to a
//! follow-up evaluation or to a deployment; a deployment eventually succeeds
//! or fails. [`poll`] advances this state machine by at most one remote read
//! and returns; the caller decides when to call it again.

use super::{EngineError, Result};
use declarative::wait::{Progress, Refresh};
use nomad_api::{Client, Deployment, status};
use std::fmt;

/// Where the monitor is in the evaluation chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    MonitoringEvaluation(String),
    MonitoringDeployment(String),
    /// Scheduled, but nothing to roll out (e.g. batch jobs)
    JobScheduledWithoutDeployment,
    DeploymentSuccessful,
}

impl PollState {
    /// Check if no further polling is needed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::JobScheduledWithoutDeployment | Self::DeploymentSuccessful
        )
    }

    /// Short state name
    pub fn name(&self) -> &'static str {
        match self {
            Self::MonitoringEvaluation(_) => "monitoring_evaluation",
            Self::MonitoringDeployment(_) => "monitoring_deployment",
            Self::JobScheduledWithoutDeployment => "job_scheduled_without_deployment",
            Self::DeploymentSuccessful => "deployment_successful",
        }
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MonitoringEvaluation(id) => write!(f, "monitoring evaluation '{id}'"),
            Self::MonitoringDeployment(id) => write!(f, "monitoring deployment '{id}'"),
            Self::JobScheduledWithoutDeployment => {
                f.write_str("job scheduled without deployment")
            }
            Self::DeploymentSuccessful => f.write_str("deployment successful"),
        }
    }
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStep {
    pub state: PollState,
    /// Deployment read during this poll, if one was read
    pub deployment: Option<Deployment>,
}

impl PollStep {
    fn to(state: PollState) -> Self {
        Self {
            state,
            deployment: None,
        }
    }
}

fn is_failed_evaluation(value: &str) -> bool {
    // The server spells it "canceled"; accept either.
    value == status::EVAL_FAILED || value == status::EVAL_CANCELED || value == "cancelled"
}

/// Advance the state machine by one remote read.
///
/// Terminal states are returned unchanged without a remote call.
pub fn poll(client: &Client, state: &PollState) -> Result<PollStep> {
    match state {
        PollState::MonitoringEvaluation(eval_id) => poll_evaluation(client, eval_id),
        PollState::MonitoringDeployment(deployment_id) => poll_deployment(client, deployment_id),
        terminal => Ok(PollStep::to(terminal.clone())),
    }
}

fn poll_evaluation(client: &Client, eval_id: &str) -> Result<PollStep> {
    log::debug!("monitoring evaluation '{eval_id}'");
    let eval = client
        .evaluation_info(eval_id)
        .map_err(|source| EngineError::PollTransport {
            object: "evaluation",
            id: eval_id.to_string(),
            source,
        })?;

    if eval.status == status::EVAL_COMPLETE {
        let next = if !eval.next_eval.is_empty() {
            log::debug!("will monitor follow-up evaluation '{}'", eval.next_eval);
            PollState::MonitoringEvaluation(eval.next_eval)
        } else if !eval.deployment_id.is_empty() {
            log::debug!(
                "job has been scheduled, will monitor deployment '{}'",
                eval.deployment_id
            );
            PollState::MonitoringDeployment(eval.deployment_id)
        } else {
            log::warn!("job has been scheduled, but there is no deployment to monitor");
            PollState::JobScheduledWithoutDeployment
        };
        return Ok(PollStep::to(next));
    }

    if is_failed_evaluation(&eval.status) {
        return Err(EngineError::EvaluationFailed {
            eval_id: eval.id,
            description: eval.status_description,
        });
    }

    Ok(PollStep::to(PollState::MonitoringEvaluation(
        eval_id.to_string(),
    )))
}

fn poll_deployment(client: &Client, deployment_id: &str) -> Result<PollStep> {
    log::debug!("monitoring deployment '{deployment_id}'");
    let deployment =
        client
            .deployment_info(deployment_id)
            .map_err(|source| EngineError::PollTransport {
                object: "deployment",
                id: deployment_id.to_string(),
                source,
            })?;

    match deployment.status.as_str() {
        status::DEPLOYMENT_SUCCESSFUL => {
            log::debug!("deployment '{}' successful", deployment.id);
            Ok(PollStep {
                state: PollState::DeploymentSuccessful,
                deployment: Some(deployment),
            })
        }
        status::DEPLOYMENT_FAILED | status::DEPLOYMENT_CANCELLED => {
            log::debug!("deployment unsuccessful: {}", deployment.status_description);
            Err(EngineError::DeploymentFailed {
                id: deployment.id,
                status: deployment.status,
                description: deployment.status_description,
            })
        }
        _ => Ok(PollStep {
            state: PollState::MonitoringDeployment(deployment_id.to_string()),
            deployment: Some(deployment),
        }),
    }
}

/// Final state of a monitored apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub state: PollState,
    pub deployment: Option<Deployment>,
}

/// Drives [`poll`] from [`declarative::wait_for_state`]
pub struct DeploymentMonitor<'a> {
    client: &'a Client,
    state: PollState,
    deployment: Option<Deployment>,
}

impl<'a> DeploymentMonitor<'a> {
    /// Start monitoring from the evaluation a registration returned.
    pub fn new(client: &'a Client, eval_id: impl Into<String>) -> Self {
        Self {
            client,
            state: PollState::MonitoringEvaluation(eval_id.into()),
            deployment: None,
        }
    }
}

impl Refresh for DeploymentMonitor<'_> {
    type Output = MonitorOutcome;
    type Error = EngineError;

    fn refresh(&mut self) -> Result<Progress<MonitorOutcome>> {
        let step = poll(self.client, &self.state)?;
        if step.state != self.state {
            log::debug!("{} -> {}", self.state.name(), step.state.name());
        }
        self.state = step.state;
        if step.deployment.is_some() {
            self.deployment = step.deployment;
        }

        if self.state.is_terminal() {
            Ok(Progress::Done(MonitorOutcome {
                state: self.state.clone(),
                deployment: self.deployment.take(),
            }))
        } else {
            Ok(Progress::Pending {
                status: self.state.to_string(),
            })
        }
    }
}
