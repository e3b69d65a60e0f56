use anyhow::Result;
use nomad_api::Client;

use super::Session;
use crate::Context;
use crate::engine::{ReadOutcome, Reconciler};
use crate::progress;
use crate::resource::{Address, CsiVolumeKind, JobKind, ResourceKind, ResourceType};
use crate::state::ConvergeState;
use crate::ui;

/// What refreshing one resource did to its stored state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refreshed {
    Unchanged,
    Updated,
    /// The cluster no longer has it; dropped from state
    Forgotten,
}

pub fn run(ctx: &Context, address: Option<Address>) -> Result<()> {
    let mut session = Session::open(ctx)?;

    let addresses = match address {
        Some(address) => vec![address],
        None => session.state.addresses(),
    };
    if addresses.is_empty() {
        ui::info("No managed resources");
        return Ok(());
    }

    let mut failures = 0;
    for address in &addresses {
        let pb = progress::spinner(&format!("Refreshing {address}"));
        match refresh_address(&session.client, &mut session.state, address) {
            Ok(Refreshed::Forgotten) => {
                progress::finish_success(&pb, &format!("{address} no longer exists, forgotten"));
            }
            Ok(Refreshed::Updated) => progress::finish_success(&pb, &format!("{address} updated")),
            Ok(Refreshed::Unchanged) => {
                progress::finish_success(&pb, &format!("{address} up to date"));
            }
            Err(e) => {
                failures += 1;
                progress::finish_error(&pb, &format!("{address}: {e:#}"));
            }
        }
    }

    session.save()?;
    if failures > 0 {
        anyhow::bail!("{failures} of {} resource(s) failed to refresh", addresses.len());
    }
    Ok(())
}

/// Refresh one stored resource of any kind
pub fn refresh_address(
    client: &Client,
    state: &mut ConvergeState,
    address: &Address,
) -> Result<Refreshed> {
    match address.resource_type {
        ResourceType::Volume => refresh_resource::<CsiVolumeKind>(client, state, address),
        ResourceType::Job => refresh_resource::<JobKind>(client, state, address),
    }
}

/// Re-read a stored resource and update or drop its observation.
pub fn refresh_resource<K: ResourceKind>(
    client: &Client,
    state: &mut ConvergeState,
    address: &Address,
) -> Result<Refreshed> {
    let Some(mut stored) = state.get(address).cloned() else {
        anyhow::bail!("{address} is not managed by converge");
    };

    match Reconciler::new(client).read::<K>(&stored.observed.identity())? {
        ReadOutcome::Gone => {
            state.remove(address);
            Ok(Refreshed::Forgotten)
        }
        ReadOutcome::Found(mut observed) => {
            observed.carry_deployment(&stored.observed);
            if observed == stored.observed {
                return Ok(Refreshed::Unchanged);
            }
            log::debug!(
                "{address} modify index {} -> {}",
                stored.observed.modify_index,
                observed.modify_index
            );
            stored.observed = observed;
            state.upsert(address, stored);
            Ok(Refreshed::Updated)
        }
    }
}
