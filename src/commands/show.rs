use anyhow::Result;

use super::Session;
use crate::Context;
use crate::resource::{Address, Details};
use crate::state::{ConvergeState, ResourceState};
use crate::ui;

pub fn run(ctx: &Context, address: Option<Address>) -> Result<()> {
    let session = Session::open(ctx)?;
    let entries = select(&session.state, address.as_ref())?;

    if entries.is_empty() {
        ui::info("No managed resources");
        return Ok(());
    }

    ui::header("Managed resources");
    for (address, resource) in entries {
        print_resource(&address, resource);
    }
    ui::dim(&format!(
        "State last updated {}",
        session.state.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    Ok(())
}

/// Stored resources to show, all of them when no address is given
pub fn select<'a>(
    state: &'a ConvergeState,
    address: Option<&Address>,
) -> Result<Vec<(Address, &'a ResourceState)>> {
    match address {
        Some(address) => match state.get(address) {
            Some(resource) => Ok(vec![(address.clone(), resource)]),
            None => anyhow::bail!("{address} is not managed by converge"),
        },
        None => Ok(state
            .addresses()
            .into_iter()
            .filter_map(|address| state.get(&address).map(|r| (address, r)))
            .collect()),
    }
}

fn print_resource(address: &Address, resource: &ResourceState) {
    let observed = &resource.observed;
    ui::section(&address.to_string());
    ui::kv("id", &observed.id);
    ui::kv("name", &observed.name);
    ui::kv("namespace", &observed.namespace);
    ui::kv("modify_index", &observed.modify_index.to_string());

    match &observed.details {
        Details::Volume {
            external_id,
            plugin_id,
            access_mode,
            attachment_mode,
            mount_options,
        } => {
            ui::kv("plugin_id", plugin_id);
            ui::kv("external_id", ui::or_dash(external_id));
            ui::kv("access_mode", ui::or_dash(access_mode));
            ui::kv("attachment_mode", ui::or_dash(attachment_mode));
            ui::kv("mount_options", mount_options.as_deref().unwrap_or("-"));
        }
        Details::Job {
            job_type,
            region,
            status,
            deployment_id,
            deployment_status,
        } => {
            ui::kv("type", job_type);
            ui::kv("region", region);
            ui::kv("status", ui::or_dash(status));
            ui::kv("allocations", &observed.allocation_ids.len().to_string());
            ui::kv("deployment_id", deployment_id.as_deref().unwrap_or("-"));
            ui::kv(
                "deployment_status",
                deployment_status.as_deref().unwrap_or("-"),
            );
        }
    }

    let settings = &resource.settings;
    if !settings.deregister_on_destroy {
        ui::dim("not deregistered on destroy");
    }
    if settings.json {
        ui::dim("spec format: json");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ObservedRecord, ResourceSettings, ResourceType};

    fn resource(id: &str) -> ResourceState {
        ResourceState {
            resource_type: ResourceType::Volume,
            spec: String::new(),
            settings: ResourceSettings::default(),
            observed: ObservedRecord {
                id: id.to_string(),
                name: id.to_string(),
                namespace: "default".to_string(),
                modify_index: 1,
                create_index: 1,
                allocation_ids: vec![],
                details: Details::Volume {
                    external_id: String::new(),
                    plugin_id: "aws-ebs0".to_string(),
                    access_mode: String::new(),
                    attachment_mode: String::new(),
                    mount_options: None,
                },
            },
        }
    }

    fn state() -> ConvergeState {
        let mut state = ConvergeState::default();
        state.upsert(&Address::new(ResourceType::Volume, "b"), resource("b"));
        state.upsert(&Address::new(ResourceType::Volume, "a"), resource("a"));
        state
    }

    #[test]
    fn test_select_all_sorted() {
        let state = state();
        let names: Vec<String> = select(&state, None)
            .unwrap()
            .into_iter()
            .map(|(address, _)| address.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_select_one() {
        let state = state();
        let address = Address::new(ResourceType::Volume, "b");
        let selected = select(&state, Some(&address)).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].1.observed.id, "b");
    }

    #[test]
    fn test_select_unmanaged() {
        let state = state();
        let address = Address::new(ResourceType::Job, "a");
        assert!(select(&state, Some(&address)).is_err());
    }
}
