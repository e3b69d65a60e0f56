use anyhow::Result;
use declarative::{ApplyResult, ConfirmCallback};
use nomad_api::Client;

use super::{Session, confirmer};
use crate::Context;
use crate::cli::DestroyArgs;
use crate::engine::Reconciler;
use crate::resource::{Address, CsiVolumeKind, JobKind, ResourceKind, ResourceType};
use crate::state::ConvergeState;
use crate::ui;

pub fn run(ctx: &Context, args: DestroyArgs) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let mut confirm = confirmer(args.yes);

    let result = match args.address.resource_type {
        ResourceType::Volume => destroy_resource::<CsiVolumeKind>(
            &session.client,
            &mut session.state,
            &args.address,
            confirm.as_mut(),
        )?,
        ResourceType::Job => destroy_resource::<JobKind>(
            &session.client,
            &mut session.state,
            &args.address,
            confirm.as_mut(),
        )?,
    };

    match result {
        ApplyResult::Skipped { reason } if reason == DECLINED => {
            ui::info("Destroy cancelled");
        }
        ApplyResult::Skipped { reason } => {
            session.save()?;
            ui::warn(&format!("Forgot {} without deregistering ({reason})", args.address));
        }
        _ => {
            session.save()?;
            ui::success(&format!("Destroyed {}", args.address));
        }
    }
    Ok(())
}

const DECLINED: &str = "not confirmed";

/// Deregister a managed resource and drop it from `state`.
///
/// An object the cluster no longer knows is treated as already removed.
pub fn destroy_resource<K: ResourceKind>(
    client: &Client,
    state: &mut ConvergeState,
    address: &Address,
    confirm: &mut dyn ConfirmCallback,
) -> Result<ApplyResult> {
    let Some(stored) = state.get(address).cloned() else {
        anyhow::bail!("{address} is not managed by converge");
    };
    let identity = stored.observed.identity();

    if !confirm.confirm(&format!("Destroy {address} ({identity})?"))? {
        return Ok(ApplyResult::Skipped {
            reason: DECLINED.to_string(),
        });
    }

    let result = match Reconciler::new(client).deregister::<K>(&identity, &stored.settings) {
        Ok(result) => result,
        Err(e) if e.remote().is_some_and(nomad_api::Error::is_not_found) => {
            log::warn!("{address} is already gone from the cluster");
            ApplyResult::Removed
        }
        Err(e) => return Err(e.into()),
    };

    state.remove(address);
    Ok(result)
}
