//! Reconciliation engine
//!
//! The engine turns a spec into remote state:
//! 1. Planning - Diff the stored observation against the desired spec
//! 2. Reconciling - Register, read and deregister remote objects
//! 3. Polling - Follow the evaluation chain of a job until it settles

pub mod differ;
pub mod planner;
pub mod poller;
pub mod reconciler;

pub use planner::{Plan, SpecValue, plan};
pub use poller::{DeploymentMonitor, MonitorOutcome, PollState};
pub use reconciler::{ReadOutcome, Reconciler};

use crate::resource::ResourceType;
use declarative::Identity;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the engine
///
/// Remote errors are wrapped verbatim with the operation and identity; none
/// of them are retried here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] jobspec::Error),

    #[error("error applying {kind} {identity}: {source}")]
    Apply {
        kind: ResourceType,
        identity: Identity,
        #[source]
        source: nomad_api::Error,
    },

    #[error("error deregistering {kind} {identity}: {source}")]
    Deregister {
        kind: ResourceType,
        identity: Identity,
        #[source]
        source: nomad_api::Error,
    },

    #[error("error reading {kind} {identity}: {source}")]
    Read {
        kind: ResourceType,
        identity: Identity,
        #[source]
        source: nomad_api::Error,
    },

    #[error("error reading {object} '{id}': {source}")]
    PollTransport {
        object: &'static str,
        id: String,
        #[source]
        source: nomad_api::Error,
    },

    #[error("evaluation failed: {description}")]
    EvaluationFailed { eval_id: String, description: String },

    #[error("deployment '{id}' terminated with status '{status}': '{description}'")]
    DeploymentFailed {
        id: String,
        status: String,
        description: String,
    },
}

impl EngineError {
    /// Check if an evaluation or deployment reached a failed state
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            Self::EvaluationFailed { .. } | Self::DeploymentFailed { .. }
        )
    }

    /// Underlying remote error, if any
    pub fn remote(&self) -> Option<&nomad_api::Error> {
        match self {
            Self::Apply { source, .. }
            | Self::Deregister { source, .. }
            | Self::Read { source, .. }
            | Self::PollTransport { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::Apply {
            kind: ResourceType::Volume,
            identity: Identity::new("", "mysql"),
            source: nomad_api::Error::status(500, "boom"),
        };
        assert_eq!(
            err.to_string(),
            "error applying volume default/mysql: Unexpected response code: 500 (boom)"
        );
        assert!(err.remote().is_some());

        let err = EngineError::DeploymentFailed {
            id: "d1".to_string(),
            status: "failed".to_string(),
            description: "Failed due to progress deadline".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "deployment 'd1' terminated with status 'failed': 'Failed due to progress deadline'"
        );
        assert!(err.is_terminal_failure());
    }
}
