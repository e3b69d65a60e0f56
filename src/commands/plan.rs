use anyhow::Result;
use declarative::PlanAction;

use super::{Session, read_spec, resolve_settings};
use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::{SpecValue, differ, plan};
use crate::resource::{Address, CsiVolumeKind, JobKind, ResourceKind, ResourceSettings, ResourceType};
use crate::state::ConvergeState;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let desired = match &args.spec {
        Some(path) => SpecValue::Known(read_spec(path)?),
        None => SpecValue::Unknown,
    };
    let settings = resolve_settings(&session.config.resource, args.json, false, false, false);
    let address = args.address();

    let action = match args.resource_type {
        ResourceType::Volume => {
            show_plan::<CsiVolumeKind>(&session.state, &address, &desired, &settings)?
        }
        ResourceType::Job => show_plan::<JobKind>(&session.state, &address, &desired, &settings)?,
    };

    if !ctx.quiet {
        differ::display_summary(action);
    }
    Ok(())
}

/// Plan `desired` against stored state and print the result
pub fn show_plan<K: ResourceKind>(
    state: &ConvergeState,
    address: &Address,
    desired: &SpecValue,
    settings: &ResourceSettings,
) -> Result<PlanAction> {
    let prior = state.get(address);
    let plan = plan::<K>(prior, desired, settings)?;
    let new_spec = match desired {
        SpecValue::Known(raw) => Some(raw.as_str()),
        SpecValue::Unknown => None,
    };
    differ::display_plan(address, &plan, prior.map(|p| p.spec.as_str()), new_spec);
    Ok(plan.action)
}
