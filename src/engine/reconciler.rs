//! Reconciling - apply desired records and read remote state back

use super::{EngineError, Result};
use crate::resource::{ObservedRecord, ResourceKind, ResourceSettings};
use declarative::{ApplyResult, Identity};
use jobspec::SpecRecord;
use nomad_api::Client;

/// Result of a successful apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub observed: ObservedRecord,
    /// Evaluation created by the registration, for job-like resources
    pub eval_id: Option<String>,
}

/// Result of reading a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Found(ObservedRecord),
    /// The cluster no longer knows the resource; forget it
    Gone,
}

/// Applies records against the cluster and materializes what it reports
pub struct Reconciler<'a> {
    client: &'a Client,
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Register `desired` in its namespace, then read it back.
    pub fn apply<K: ResourceKind>(&self, desired: &K::Record) -> Result<Applied> {
        let identity = Identity::new(desired.namespace(), desired.id());

        let eval_id = K::register(self.client, desired, &identity.namespace).map_err(|source| {
            EngineError::Apply {
                kind: K::TYPE,
                identity: identity.clone(),
                source,
            }
        })?;

        let observed = K::read(self.client, &identity).map_err(|source| EngineError::Read {
            kind: K::TYPE,
            identity: identity.clone(),
            source,
        })?;

        Ok(Applied { observed, eval_id })
    }

    /// Remove the resource from the cluster, unless the settings say not to.
    pub fn deregister<K: ResourceKind>(
        &self,
        identity: &Identity,
        settings: &ResourceSettings,
    ) -> Result<ApplyResult> {
        if !settings.deregister_on_destroy {
            log::warn!(
                "{} {identity} will not be deregistered since 'deregister_on_destroy' is false",
                K::TYPE
            );
            return Ok(ApplyResult::Skipped {
                reason: "deregister_on_destroy is false".to_string(),
            });
        }

        let identity = Identity::new(identity.namespace.clone(), identity.id.clone());
        K::deregister(self.client, &identity, settings).map_err(|source| {
            EngineError::Deregister {
                kind: K::TYPE,
                identity: identity.clone(),
                source,
            }
        })?;
        Ok(ApplyResult::Removed)
    }

    /// Read the resource; a 404 means it is gone, not an error.
    pub fn read<K: ResourceKind>(&self, identity: &Identity) -> Result<ReadOutcome> {
        match K::read(self.client, identity) {
            Ok(observed) => Ok(ReadOutcome::Found(observed)),
            Err(e) if e.is_not_found() => {
                log::debug!("{} {identity} not found, clearing", K::TYPE);
                Ok(ReadOutcome::Gone)
            }
            Err(source) => Err(EngineError::Read {
                kind: K::TYPE,
                identity: identity.clone(),
                source,
            }),
        }
    }
}
