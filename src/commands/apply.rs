use anyhow::Result;
use declarative::{
    ApplyResult, ConfirmCallback, Identity, PlanAction, WaitCallback, WaitError, WaitOptions,
    wait_for_state,
};
use nomad_api::Client;

use super::{Session, confirmer, read_spec, resolve_settings};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{
    DeploymentMonitor, EngineError, MonitorOutcome, PollState, ReadOutcome, Reconciler, SpecValue,
    differ, plan,
};
use crate::progress::SpinnerProgress;
use crate::resource::{
    Address, CsiVolumeKind, JobKind, ObservedRecord, ResourceKind, ResourceSettings, ResourceType,
};
use crate::state::{ConvergeState, ResourceState};
use crate::ui;

/// How one apply should behave
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub settings: ResourceSettings,
    /// Skip monitoring the job's deployment
    pub detach: bool,
    pub dry_run: bool,
}

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let raw = read_spec(&args.spec.spec)?;
    let options = ApplyOptions {
        settings: resolve_settings(
            &session.config.resource,
            args.spec.json,
            args.no_deregister_on_destroy,
            args.no_deregister_on_id_change,
            args.purge_on_destroy,
        ),
        detach: args.detach || session.config.wait.detach,
        dry_run: args.dry_run,
    };
    let wait = session.config.wait_options();
    let address = args.spec.address();
    let mut confirm = confirmer(args.yes);
    let mut progress = SpinnerProgress::new(&format!("Waiting for {address}"), ctx.quiet);

    let result = match args.spec.resource_type {
        ResourceType::Volume => apply_resource::<CsiVolumeKind>(
            &session.client,
            &mut session.state,
            &address,
            &raw,
            &options,
            &wait,
            confirm.as_mut(),
            &mut progress,
        ),
        ResourceType::Job => apply_resource::<JobKind>(
            &session.client,
            &mut session.state,
            &address,
            &raw,
            &options,
            &wait,
            confirm.as_mut(),
            &mut progress,
        ),
    };
    progress.finish();

    // A failed deployment still leaves the job registered, so state is
    // written before the error is reported.
    if !options.dry_run {
        session.save()?;
    }

    match result? {
        ApplyResult::NoChange => differ::display_summary(PlanAction::NoOp),
        ApplyResult::Created => ui::success(&format!("Created {address}")),
        ApplyResult::Modified => ui::success(&format!("Updated {address}")),
        ApplyResult::Replaced => ui::success(&format!("Replaced {address}")),
        ApplyResult::Removed => ui::success(&format!("Removed {address}")),
        ApplyResult::Skipped { reason } => ui::info(&format!("Skipped {address}: {reason}")),
    }
    Ok(())
}

/// Plan, confirm and apply one resource, recording the result in `state`.
#[allow(clippy::too_many_arguments)]
pub fn apply_resource<K: ResourceKind>(
    client: &Client,
    state: &mut ConvergeState,
    address: &Address,
    raw: &str,
    options: &ApplyOptions,
    wait: &WaitOptions,
    confirm: &mut dyn ConfirmCallback,
    progress: &mut dyn WaitCallback,
) -> Result<ApplyResult> {
    let prior = state.get(address).cloned();
    let plan = plan::<K>(
        prior.as_ref(),
        &SpecValue::Known(raw.to_string()),
        &options.settings,
    )?;
    differ::display_plan(
        address,
        &plan,
        prior.as_ref().map(|p| p.spec.as_str()),
        Some(raw),
    );

    if plan.action == PlanAction::NoOp {
        if let Some(mut stored) = prior {
            if stored.settings != options.settings {
                log::debug!("{address} settings changed, updating state");
                stored.settings = options.settings;
                state.upsert(address, stored);
            }
        }
        return Ok(ApplyResult::NoChange);
    }

    if options.dry_run {
        return Ok(ApplyResult::Skipped {
            reason: "dry run".to_string(),
        });
    }

    if !confirm.confirm(&format!("Apply {} to {address}?", plan.action))? {
        return Ok(ApplyResult::Skipped {
            reason: "not confirmed".to_string(),
        });
    }

    let Some(desired) = plan.desired else {
        anyhow::bail!("Nothing to register for {address}");
    };
    let reconciler = Reconciler::new(client);

    if plan.action == PlanAction::Replace {
        if let Some(prior) = &prior {
            let identity = prior.observed.identity();
            log::info!("Replacing {address}: deregistering {identity} first");
            reconciler.deregister::<K>(&identity, &prior.settings)?;
            state.remove(address);
        }
    }

    let applied = reconciler.apply::<K>(&desired)?;
    let mut observed = applied.observed;

    let mut monitor_error = None;
    let mut reread_error = None;
    match applied.eval_id {
        Some(eval_id) if !options.detach => {
            let mut monitor = DeploymentMonitor::new(client, eval_id);
            let monitored = wait_for_state(&mut monitor, wait, progress);

            // Allocations and indexes move during the rollout
            match reread::<K>(&reconciler, &observed.identity()) {
                Ok(fresh) => observed = fresh,
                Err(e) => reread_error = Some(e),
            }

            match monitored {
                Ok(outcome) => record_outcome(&mut observed, &outcome),
                Err(e) => {
                    match &e {
                        WaitError::Refresh(EngineError::DeploymentFailed { id, status, .. }) => {
                            observed.set_deployment(id, status);
                        }
                        WaitError::Refresh(EngineError::EvaluationFailed { eval_id, .. }) => {
                            log::debug!("{address}: evaluation '{eval_id}' failed");
                        }
                        _ => {}
                    }
                    monitor_error = Some(e);
                }
            }
        }
        Some(eval_id) => log::info!("Detached from evaluation '{eval_id}'"),
        None => {}
    }

    state.upsert(
        address,
        ResourceState {
            resource_type: K::TYPE,
            spec: raw.to_string(),
            settings: options.settings,
            observed,
        },
    );

    if let Some(e) = monitor_error {
        let outcome = match &e {
            WaitError::Refresh(inner) if inner.is_terminal_failure() => "failed to roll out",
            _ => "did not settle",
        };
        return Err(
            anyhow::Error::new(e).context(format!("{address} was registered but {outcome}"))
        );
    }
    if let Some(e) = reread_error {
        return Err(e.context(format!("{address} was registered but could not be read back")));
    }

    Ok(match plan.action {
        PlanAction::Replace => ApplyResult::Replaced,
        PlanAction::Update => ApplyResult::Modified,
        _ => ApplyResult::Created,
    })
}

/// Read the resource again once its rollout has settled
fn reread<K: ResourceKind>(
    reconciler: &Reconciler<'_>,
    identity: &Identity,
) -> Result<ObservedRecord> {
    match reconciler.read::<K>(identity)? {
        ReadOutcome::Found(observed) => Ok(observed),
        ReadOutcome::Gone => anyhow::bail!("{} {identity} disappeared during its rollout", K::TYPE),
    }
}

fn record_outcome(observed: &mut ObservedRecord, outcome: &MonitorOutcome) {
    if let Some(deployment) = &outcome.deployment {
        observed.set_deployment(&deployment.id, &deployment.status);
    }
    if outcome.state == PollState::JobScheduledWithoutDeployment {
        ui::dim("Job scheduled without a deployment to monitor");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Attribute, Details};
    use declarative::{AttrValue, AutoConfirm, AutoDecline, NoProgress};
    use nomad_api::{AllocationStub, Deployment, Error, Evaluation, MockBackend, Operation};
    use std::time::Duration;

    const VOLUME: &str = r#"
        [volume.mysql]
        plugin_id = "aws-ebs0"
        access_mode = "single-node-writer"
        attachment_mode = "file-system"
    "#;

    const WEB: &str = r#"
        [job.web]
        datacenters = ["dc1"]
    "#;

    fn setup() -> (MockBackend, Client) {
        let mock = MockBackend::new();
        let client = Client::with_backend(Box::new(mock.clone()));
        (mock, client)
    }

    fn options() -> ApplyOptions {
        ApplyOptions {
            settings: ResourceSettings::default(),
            detach: false,
            dry_run: false,
        }
    }

    fn fast() -> WaitOptions {
        WaitOptions {
            min_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            timeout: Duration::from_secs(5),
            ..WaitOptions::default()
        }
    }

    /// Places allocations on the mock while the deployment is pending
    struct Scheduler {
        mock: MockBackend,
    }

    impl WaitCallback for Scheduler {
        fn on_pending(&mut self, _status: &str, _attempt: u32, _next_delay: Duration) {
            let allocation = AllocationStub {
                id: "a1".to_string(),
                name: "web.frontend[0]".to_string(),
                client_status: "running".to_string(),
            };
            self.mock.set_job_allocations("default", "web", vec![allocation]);
        }
    }

    fn queue_rollout(mock: &MockBackend, statuses: &[&str]) {
        mock.queue_eval_id("e1");
        mock.push_evaluation(Evaluation {
            id: "e1".to_string(),
            status: "complete".to_string(),
            deployment_id: "d1".to_string(),
            ..Default::default()
        });
        for status in statuses {
            mock.push_deployment(Deployment {
                id: "d1".to_string(),
                status: (*status).to_string(),
                ..Default::default()
            });
        }
    }

    fn volume_address() -> Address {
        Address::new(ResourceType::Volume, "mysql")
    }

    fn job_address() -> Address {
        Address::new(ResourceType::Job, "web")
    }

    fn apply_volume(
        client: &Client,
        state: &mut ConvergeState,
        raw: &str,
        options: &ApplyOptions,
    ) -> Result<ApplyResult> {
        apply_resource::<CsiVolumeKind>(
            client,
            state,
            &volume_address(),
            raw,
            options,
            &fast(),
            &mut AutoConfirm,
            &mut NoProgress,
        )
    }

    fn apply_job(
        client: &Client,
        state: &mut ConvergeState,
        options: &ApplyOptions,
    ) -> Result<ApplyResult> {
        apply_resource::<JobKind>(
            client,
            state,
            &job_address(),
            WEB,
            options,
            &fast(),
            &mut AutoConfirm,
            &mut NoProgress,
        )
    }

    #[test]
    fn test_create_volume() {
        let (mock, client) = setup();
        let mut state = ConvergeState::default();

        let result = apply_volume(&client, &mut state, VOLUME, &options()).unwrap();

        assert_eq!(result, ApplyResult::Created);
        assert!(mock.has_volume("default", "mysql"));
        let stored = state.get(&volume_address()).unwrap();
        assert_eq!(stored.spec, VOLUME);
        assert_eq!(stored.observed.namespace, "default");
    }

    #[test]
    fn test_reapply_is_noop() {
        let (mock, client) = setup();
        let mut state = ConvergeState::default();
        apply_volume(&client, &mut state, VOLUME, &options()).unwrap();

        let result = apply_volume(&client, &mut state, VOLUME, &options()).unwrap();

        assert_eq!(result, ApplyResult::NoChange);
        assert_eq!(mock.calls_of(Operation::RegisterVolume).len(), 1);
    }

    #[test]
    fn test_noop_records_new_settings() {
        let (_, client) = setup();
        let mut state = ConvergeState::default();
        apply_volume(&client, &mut state, VOLUME, &options()).unwrap();

        let mut changed = options();
        changed.settings.deregister_on_destroy = false;
        apply_volume(&client, &mut state, VOLUME, &changed).unwrap();

        assert!(!state.get(&volume_address()).unwrap().settings.deregister_on_destroy);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let (mock, client) = setup();
        let mut state = ConvergeState::default();
        let mut opts = options();
        opts.dry_run = true;

        let result = apply_volume(&client, &mut state, VOLUME, &opts).unwrap();

        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(mock.calls().is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_declined_changes_nothing() {
        let (mock, client) = setup();
        let mut state = ConvergeState::default();

        let result = apply_resource::<CsiVolumeKind>(
            &client,
            &mut state,
            &volume_address(),
            VOLUME,
            &options(),
            &fast(),
            &mut AutoDecline,
            &mut NoProgress,
        )
        .unwrap();

        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_namespace_change_replaces() {
        let (mock, client) = setup();
        let mut state = ConvergeState::default();
        apply_volume(&client, &mut state, VOLUME, &options()).unwrap();

        let moved = VOLUME.replace("plugin_id", "namespace = \"prod\"\nplugin_id");
        let result = apply_volume(&client, &mut state, &moved, &options()).unwrap();

        assert_eq!(result, ApplyResult::Replaced);
        assert!(!mock.has_volume("default", "mysql"));
        assert!(mock.has_volume("prod", "mysql"));
        assert_eq!(state.get(&volume_address()).unwrap().observed.namespace, "prod");
    }

    #[test]
    fn test_register_failure_keeps_prior_state() {
        let (mock, client) = setup();
        let mut state = ConvergeState::default();
        apply_volume(&client, &mut state, VOLUME, &options()).unwrap();
        let before = state.get(&volume_address()).cloned();

        mock.fail(Operation::RegisterVolume, Error::status(400, "bad plugin"));
        let changed = VOLUME.replace("single-node-writer", "multi-node-reader-only");
        let err = apply_volume(&client, &mut state, &changed, &options()).unwrap_err();

        assert!(err.to_string().contains("error applying volume default/mysql"));
        assert_eq!(state.get(&volume_address()).cloned(), before);
    }

    #[test]
    fn test_job_deployment_recorded() {
        let (mock, client) = setup();
        mock.queue_eval_id("e1");
        mock.push_evaluation(Evaluation {
            id: "e1".to_string(),
            status: "complete".to_string(),
            deployment_id: "d1".to_string(),
            ..Default::default()
        });
        mock.push_deployment(Deployment {
            id: "d1".to_string(),
            status: "running".to_string(),
            ..Default::default()
        });
        mock.push_deployment(Deployment {
            id: "d1".to_string(),
            status: "successful".to_string(),
            ..Default::default()
        });
        let mut state = ConvergeState::default();

        let result = apply_job(&client, &mut state, &options()).unwrap();

        assert_eq!(result, ApplyResult::Created);
        match &state.get(&job_address()).unwrap().observed.details {
            Details::Job {
                deployment_id,
                deployment_status,
                ..
            } => {
                assert_eq!(deployment_id.as_deref(), Some("d1"));
                assert_eq!(deployment_status.as_deref(), Some("successful"));
            }
            Details::Volume { .. } => panic!("expected job details"),
        }
        assert_eq!(mock.calls_of(Operation::DeploymentInfo).len(), 2);
    }

    #[test]
    fn test_job_detach_skips_monitoring() {
        let (mock, client) = setup();
        let mut state = ConvergeState::default();
        let mut opts = options();
        opts.detach = true;

        apply_job(&client, &mut state, &opts).unwrap();

        assert!(mock.calls_of(Operation::EvaluationInfo).is_empty());
        assert!(state.get(&job_address()).is_some());
    }

    #[test]
    fn test_failed_deployment_saved_and_reported() {
        let (mock, client) = setup();
        mock.queue_eval_id("e1");
        mock.push_evaluation(Evaluation {
            id: "e1".to_string(),
            status: "complete".to_string(),
            deployment_id: "d1".to_string(),
            ..Default::default()
        });
        mock.push_deployment(Deployment {
            id: "d1".to_string(),
            status: "failed".to_string(),
            status_description: "Failed due to progress deadline".to_string(),
            ..Default::default()
        });
        let mut state = ConvergeState::default();

        let err = apply_job(&client, &mut state, &options()).unwrap_err();

        assert!(format!("{err:#}").contains(
            "deployment 'd1' terminated with status 'failed': 'Failed due to progress deadline'"
        ));
        let stored = state.get(&job_address()).unwrap();
        assert!(
            stored
                .observed
                .attributes()
                .contains(&(Attribute::DeploymentStatus, AttrValue::from("failed")))
        );
    }

    #[test]
    fn test_failed_evaluation_reported() {
        let (mock, client) = setup();
        mock.queue_eval_id("e1");
        mock.push_evaluation(Evaluation {
            id: "e1".to_string(),
            status: "failed".to_string(),
            status_description: "quota exceeded".to_string(),
            ..Default::default()
        });
        let mut state = ConvergeState::default();

        let err = apply_job(&client, &mut state, &options()).unwrap_err();
        assert!(format!("{err:#}").contains("evaluation failed: quota exceeded"));
    }

    #[test]
    fn test_job_read_back_after_rollout() {
        let (mock, client) = setup();
        queue_rollout(&mock, &["running", "successful"]);
        let mut state = ConvergeState::default();

        apply_resource::<JobKind>(
            &client,
            &mut state,
            &job_address(),
            WEB,
            &options(),
            &fast(),
            &mut AutoConfirm,
            &mut Scheduler { mock: mock.clone() },
        )
        .unwrap();

        let operations: Vec<Operation> = mock.calls().into_iter().map(|c| c.operation).collect();
        assert_eq!(
            operations[operations.len() - 2..],
            [Operation::JobInfo, Operation::JobAllocations]
        );
        let stored = state.get(&job_address()).unwrap();
        assert_eq!(stored.observed.allocation_ids, vec!["a1".to_string()]);
        assert!(
            stored
                .observed
                .attributes()
                .contains(&(Attribute::DeploymentStatus, AttrValue::from("successful")))
        );
    }

    #[test]
    fn test_failed_rollout_still_read_back() {
        let (mock, client) = setup();
        queue_rollout(&mock, &["running", "failed"]);
        let mut state = ConvergeState::default();

        let err = apply_resource::<JobKind>(
            &client,
            &mut state,
            &job_address(),
            WEB,
            &options(),
            &fast(),
            &mut AutoConfirm,
            &mut Scheduler { mock: mock.clone() },
        )
        .unwrap_err();

        assert!(err.to_string().contains("failed to roll out"));
        let last = mock.calls().last().map(|c| c.operation);
        assert_eq!(last, Some(Operation::JobAllocations));
        let stored = state.get(&job_address()).unwrap();
        assert_eq!(stored.observed.allocation_ids, vec!["a1".to_string()]);
    }

    #[test]
    fn test_job_gone_after_rollout() {
        let (mock, client) = setup();
        queue_rollout(&mock, &["successful"]);
        let mut state = ConvergeState::default();

        // The first read after registering succeeds, the second one 404s
        struct Purge {
            mock: MockBackend,
        }
        impl WaitCallback for Purge {
            fn on_pending(&mut self, _: &str, _: u32, _: Duration) {}
            fn on_done(&mut self, _attempts: u32) {
                self.mock.fail(Operation::JobInfo, Error::not_found("job not found"));
            }
        }

        let err = apply_resource::<JobKind>(
            &client,
            &mut state,
            &job_address(),
            WEB,
            &options(),
            &fast(),
            &mut AutoConfirm,
            &mut Purge { mock: mock.clone() },
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("disappeared during its rollout"));
        assert!(state.get(&job_address()).is_some());
    }
}
