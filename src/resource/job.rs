//! Job resource

use super::{Attribute, Details, ObservedRecord, ResourceKind, ResourceSettings, ResourceType};
use declarative::Identity;
use nomad_api::{AllocationStub, Client, Job};

/// A job registered with `POST /v1/jobs`
pub struct JobKind;

impl ResourceKind for JobKind {
    type Record = Job;

    const TYPE: ResourceType = ResourceType::Job;

    const COMPUTED: &'static [Attribute] = &[
        Attribute::Id,
        Attribute::ModifyIndex,
        Attribute::Namespace,
        Attribute::Type,
        Attribute::Name,
        Attribute::Region,
        Attribute::AllocationIds,
        Attribute::DeploymentId,
        Attribute::DeploymentStatus,
    ];

    fn register(client: &Client, record: &Job, namespace: &str) -> nomad_api::Result<Option<String>> {
        let response = client.register_job(record, namespace)?;
        if !response.warnings.is_empty() {
            log::warn!("job '{}' registered with warnings: {}", record.id, response.warnings);
        }
        log::debug!(
            "job '{}' registered, evaluation '{}'",
            record.id,
            response.eval_id
        );
        Ok(Some(response.eval_id).filter(|id| !id.is_empty()))
    }

    fn read(client: &Client, identity: &Identity) -> nomad_api::Result<ObservedRecord> {
        log::debug!("reading job {identity}");
        let job = client.job_info(&identity.id, &identity.namespace)?;
        let allocations = client.job_allocations(&identity.id, &identity.namespace)?;
        Ok(observe(&job, &allocations))
    }

    fn deregister(
        client: &Client,
        identity: &Identity,
        settings: &ResourceSettings,
    ) -> nomad_api::Result<()> {
        log::debug!(
            "deregistering job {identity} (purge: {})",
            settings.purge_on_destroy
        );
        let eval_id =
            client.deregister_job(&identity.id, &identity.namespace, settings.purge_on_destroy)?;
        log::debug!("job {identity} deregistered, evaluation '{eval_id}'");
        Ok(())
    }
}

/// Convert a remote job and its allocations into an observed record
pub fn observe(job: &Job, allocations: &[AllocationStub]) -> ObservedRecord {
    ObservedRecord {
        id: job.id.clone(),
        name: job.name.clone(),
        namespace: job.namespace.clone(),
        modify_index: job.modify_index,
        create_index: job.create_index,
        allocation_ids: allocations.iter().map(|a| a.id.clone()).collect(),
        details: Details::Job {
            job_type: job.job_type.clone().unwrap_or_default(),
            region: job.region.clone().unwrap_or_default(),
            status: job.status.clone().unwrap_or_default(),
            deployment_id: None,
            deployment_status: None,
        },
    }
}
