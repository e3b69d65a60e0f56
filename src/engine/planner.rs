//! Planning - diff stored state against a desired spec
//!
//! A plan never talks to the cluster. It compares the raw spec stored with
//! the last apply against the new one, decides whether anything changes and
//! whether the change can be applied in place.

use super::Result;
use crate::resource::{Attribute, ResourceKind, ResourceSettings};
use crate::state::ResourceState;
use declarative::{DEFAULT_NAMESPACE, PlanAction, ResourceDiff};
use jobspec::{SpecFormat, SpecRecord};

/// Desired spec text, which may not be known yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecValue {
    /// Not known yet, as when `plan` is run without a spec file
    Unknown,
    Known(String),
}

/// Outcome of planning one resource
#[derive(Debug, Clone)]
pub struct Plan<R> {
    pub action: PlanAction,
    pub diff: ResourceDiff<Attribute>,
    /// Parsed desired record; `None` when nothing needs applying or the
    /// spec is not known yet
    pub desired: Option<R>,
}

impl<R> Plan<R> {
    fn no_op(diff: ResourceDiff<Attribute>) -> Self {
        Self {
            action: PlanAction::NoOp,
            diff,
            desired: None,
        }
    }
}

/// Plan the change from `prior` to `desired`.
///
/// `prior` is the stored state of the resource, `None` when it has never
/// been applied.
pub fn plan<K: ResourceKind>(
    prior: Option<&ResourceState>,
    desired: &SpecValue,
    settings: &ResourceSettings,
) -> Result<Plan<K::Record>> {
    let mut diff = ResourceDiff::new(
        prior
            .map(|p| p.observed.attributes())
            .unwrap_or_default(),
    );
    let fresh = if prior.is_some() {
        PlanAction::Update
    } else {
        PlanAction::Create
    };

    let raw = match desired {
        SpecValue::Unknown => {
            log::debug!("{} spec not known yet, all computed", K::TYPE);
            for attribute in K::COMPUTED {
                diff.set_new_computed(*attribute);
            }
            return Ok(Plan {
                action: fresh,
                diff,
                desired: None,
            });
        }
        SpecValue::Known(raw) => raw,
    };

    if let Some(prior) = prior {
        if prior.spec == *raw {
            log::debug!("{} spec unchanged", K::TYPE);
            return Ok(Plan::no_op(diff));
        }
        if jobspec::equivalent::<K::Record>(&prior.spec, raw) {
            log::debug!("{} spec differs only in formatting or defaults", K::TYPE);
            return Ok(Plan::no_op(diff));
        }
    }

    let mut record: K::Record = jobspec::parse(raw, SpecFormat::from_json_flag(settings.json))?;
    if record.namespace().is_empty() {
        record.set_namespace(DEFAULT_NAMESPACE);
    }

    diff.set_new(Attribute::Id, record.id());
    diff.set_new(Attribute::Name, record.name());

    match prior {
        None => diff.set_new(Attribute::Namespace, record.namespace()),
        Some(prior) if prior.observed.namespace != record.namespace() => {
            log::debug!(
                "namespace changes from '{}' to '{}', forcing replacement",
                prior.observed.namespace,
                record.namespace()
            );
            diff.set_new(Attribute::Namespace, record.namespace());
            diff.force_new(Attribute::Namespace);
        }
        Some(prior) if prior.observed.id != record.id() => {
            if settings.deregister_on_id_change {
                log::debug!(
                    "id changes from '{}' to '{}', forcing replacement",
                    prior.observed.id,
                    record.id()
                );
                diff.force_new(Attribute::Id);
                diff.force_new(Attribute::Name);
            } else {
                log::debug!(
                    "id changes from '{}' to '{}', updating in place",
                    prior.observed.id,
                    record.id()
                );
            }
        }
        Some(_) => {}
    }

    diff.set_new_computed(Attribute::ModifyIndex);
    diff.set_new_computed(Attribute::AllocationIds);

    let action = if prior.is_some() {
        diff.action()
    } else {
        PlanAction::Create
    };
    Ok(Plan {
        action,
        diff,
        desired: Some(record),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::resource::{CsiVolumeKind, Details, JobKind, ObservedRecord, ResourceType};
    use declarative::Staged;

    const VOL_A: &str = r#"
        [volume.vol-a]
        plugin_id = "aws-ebs0"
        access_mode = "single-node-writer"
        attachment_mode = "file-system"
    "#;

    fn observed_volume(namespace: &str, id: &str) -> ObservedRecord {
        ObservedRecord {
            id: id.to_string(),
            name: id.to_string(),
            namespace: namespace.to_string(),
            modify_index: 7,
            create_index: 5,
            allocation_ids: vec![],
            details: Details::Volume {
                external_id: String::new(),
                plugin_id: "aws-ebs0".to_string(),
                access_mode: "single-node-writer".to_string(),
                attachment_mode: "file-system".to_string(),
                mount_options: None,
            },
        }
    }

    fn prior(spec: &str, namespace: &str, id: &str) -> ResourceState {
        ResourceState {
            resource_type: ResourceType::Volume,
            spec: spec.to_string(),
            settings: ResourceSettings::default(),
            observed: observed_volume(namespace, id),
        }
    }

    fn known(raw: &str) -> SpecValue {
        SpecValue::Known(raw.to_string())
    }

    #[test]
    fn test_unknown_marks_everything_computed() {
        let prior = prior(VOL_A, "default", "vol-a");
        let plan =
            plan::<CsiVolumeKind>(Some(&prior), &SpecValue::Unknown, &ResourceSettings::default())
                .unwrap();

        for attribute in CsiVolumeKind::COMPUTED {
            assert!(plan.diff.is_computed(*attribute), "{attribute} not computed");
        }
        assert!(plan.desired.is_none());
        assert_eq!(plan.action, PlanAction::Update);
    }

    #[test]
    fn test_unknown_job_marks_deployment_computed() {
        let plan = plan::<JobKind>(None, &SpecValue::Unknown, &ResourceSettings::default())
            .unwrap();
        assert!(plan.diff.is_computed(Attribute::DeploymentStatus));
        assert!(plan.diff.is_computed(Attribute::Region));
        assert_eq!(plan.action, PlanAction::Create);
    }

    #[test]
    fn test_identical_text_is_noop() {
        let prior = prior(VOL_A, "default", "vol-a");
        let plan =
            plan::<CsiVolumeKind>(Some(&prior), &known(VOL_A), &ResourceSettings::default())
                .unwrap();
        assert_eq!(plan.action, PlanAction::NoOp);
        assert!(plan.desired.is_none());
    }

    #[test]
    fn test_equivalent_text_is_noop() {
        let reformatted = r#"
            [volume.vol-a]
            name = "vol-a"
            namespace = "default"
            attachment_mode = "file-system"
            access_mode = "single-node-writer"
            plugin_id = "aws-ebs0"
        "#;
        let prior = prior(VOL_A, "default", "vol-a");
        let plan = plan::<CsiVolumeKind>(
            Some(&prior),
            &known(reformatted),
            &ResourceSettings::default(),
        )
        .unwrap();
        assert_eq!(plan.action, PlanAction::NoOp);
    }

    #[test]
    fn test_create_without_prior() {
        let plan = plan::<CsiVolumeKind>(None, &known(VOL_A), &ResourceSettings::default())
            .unwrap();
        assert_eq!(plan.action, PlanAction::Create);
        let desired = plan.desired.unwrap();
        assert_eq!(desired.namespace, "default");
        assert_eq!(
            plan.diff.get(Attribute::Namespace),
            Some(Staged::Value("default".into()))
        );
        assert!(plan.diff.is_computed(Attribute::ModifyIndex));
        assert!(plan.diff.is_computed(Attribute::AllocationIds));
    }

    #[test]
    fn test_parse_failure_aborts() {
        let prior = prior(VOL_A, "default", "vol-a");
        let err = plan::<CsiVolumeKind>(
            Some(&prior),
            &known("[volume.vol-a\n"),
            &ResourceSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn test_empty_spec_rejected() {
        let settings = ResourceSettings {
            json: true,
            ..ResourceSettings::default()
        };
        let err = plan::<CsiVolumeKind>(None, &known("{}"), &settings).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn test_namespace_change_forces_replacement() {
        let prior = prior(VOL_A, "ns1", "vol-a");
        let desired = VOL_A.replace("plugin_id", "namespace = \"ns2\"\nplugin_id");
        let plan =
            plan::<CsiVolumeKind>(Some(&prior), &known(&desired), &ResourceSettings::default())
                .unwrap();

        assert_eq!(plan.action, PlanAction::Replace);
        assert!(plan.diff.is_force_new(Attribute::Namespace));
        assert!(!plan.diff.is_force_new(Attribute::Id));
    }

    #[test]
    fn test_namespace_takes_precedence_over_id() {
        let prior = prior(VOL_A, "ns1", "vol-a");
        let desired = r#"
            [volume.vol-b]
            namespace = "ns2"
            plugin_id = "aws-ebs0"
        "#;
        let plan =
            plan::<CsiVolumeKind>(Some(&prior), &known(desired), &ResourceSettings::default())
                .unwrap();

        assert_eq!(plan.action, PlanAction::Replace);
        assert!(plan.diff.is_force_new(Attribute::Namespace));
        assert!(!plan.diff.is_force_new(Attribute::Id));
        assert!(!plan.diff.is_force_new(Attribute::Name));
    }

    #[test]
    fn test_id_change_replaces_when_configured() {
        let prior = prior(VOL_A, "default", "vol-a");
        let desired = VOL_A.replace("vol-a", "vol-b");
        let plan =
            plan::<CsiVolumeKind>(Some(&prior), &known(&desired), &ResourceSettings::default())
                .unwrap();

        assert_eq!(plan.action, PlanAction::Replace);
        assert!(plan.diff.is_force_new(Attribute::Id));
        assert!(plan.diff.is_force_new(Attribute::Name));
    }

    #[test]
    fn test_id_change_in_place_when_not_configured() {
        let prior = prior(VOL_A, "default", "vol-a");
        let desired = VOL_A.replace("vol-a", "vol-b");
        let settings = ResourceSettings {
            deregister_on_id_change: false,
            ..ResourceSettings::default()
        };
        let plan = plan::<CsiVolumeKind>(Some(&prior), &known(&desired), &settings).unwrap();

        assert_eq!(plan.action, PlanAction::Update);
        assert!(!plan.diff.requires_replacement());
        assert_eq!(
            plan.diff.get(Attribute::Id),
            Some(Staged::Value("vol-b".into()))
        );
    }

    #[test]
    fn test_attribute_change_updates_in_place() {
        let prior = prior(VOL_A, "default", "vol-a");
        let desired = VOL_A.replace("single-node-writer", "multi-node-reader-only");
        let plan =
            plan::<CsiVolumeKind>(Some(&prior), &known(&desired), &ResourceSettings::default())
                .unwrap();

        assert_eq!(plan.action, PlanAction::Update);
        assert!(plan.desired.is_some());
        assert!(plan.diff.is_computed(Attribute::ModifyIndex));
        assert!(!plan.diff.has_change(Attribute::Id));
    }

    #[test]
    fn test_json_spec_with_envelope() {
        let settings = ResourceSettings {
            json: true,
            ..ResourceSettings::default()
        };
        let raw = r#"{"Job": {"ID": "web", "Datacenters": ["dc1"]}}"#;
        let plan = plan::<JobKind>(None, &known(raw), &settings).unwrap();
        let job = plan.desired.unwrap();
        assert_eq!(job.id, "web");
        assert_eq!(job.namespace, "default");
    }
}
