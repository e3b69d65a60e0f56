use anyhow::Result;
use jobspec::{SpecFormat, SpecRecord};
use nomad_api::{CsiVolume, Job};

use super::read_spec;
use crate::Context;
use crate::cli::ValidateArgs;
use crate::resource::ResourceType;
use crate::ui;

pub fn run(ctx: &Context, args: ValidateArgs) -> Result<()> {
    let raw = read_spec(&args.spec)?;
    let format = SpecFormat::from_json_flag(args.json);

    let canonical = match args.resource_type {
        ResourceType::Volume => canonical_json::<CsiVolume>(&raw, format)?,
        ResourceType::Job => canonical_json::<Job>(&raw, format)?,
    };

    if !ctx.quiet {
        ui::success(&format!("{} is a valid {} spec", args.spec.display(), args.resource_type));
    }
    println!("{canonical}");
    Ok(())
}

/// Parse a spec and render its canonical form as Nomad API JSON
pub fn canonical_json<R: SpecRecord>(raw: &str, format: SpecFormat) -> Result<String> {
    let record: R = jobspec::parse(raw, format)?;
    log::debug!("Parsed {} '{}'", R::KIND, record.id());
    Ok(serde_json::to_string_pretty(&record.canonicalized())?)
}
