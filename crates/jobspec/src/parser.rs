//! Spec parsing for both input formats.

use crate::error::{Error, Result};
use crate::{SpecFormat, SpecRecord, native};
use serde_json::Value;
use std::path::Path;

/// Parse a spec from a file path.
pub fn parse_file<R: SpecRecord>(path: &Path, format: SpecFormat) -> Result<R> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&raw, format)
}

/// Parse a spec from a string.
///
/// An input that decodes to an empty record is rejected: it is not a spec,
/// not a spec for an empty resource.
pub fn parse<R: SpecRecord>(raw: &str, format: SpecFormat) -> Result<R> {
    let record: R = match format {
        SpecFormat::Native => native::parse(raw)?,
        SpecFormat::Json => parse_json(raw)?,
    };

    if record == R::default() {
        return Err(Error::Empty { kind: R::KIND });
    }
    Ok(record)
}

/// Decode JSON, unwrapping a `{"Job": {...}}` style envelope if present.
///
/// `nomad job run -output` wraps the job in a `Job` root, so the document is
/// first read as a generic value to look for it.
fn parse_json<R: SpecRecord>(raw: &str) -> Result<R> {
    let kind = R::KIND;
    let root: Value = serde_json::from_str(raw).map_err(|source| Error::Json { kind, source })?;

    let inner = match root {
        Value::Object(mut fields) => match kind
            .envelopes()
            .iter()
            .find_map(|envelope| fields.remove(*envelope))
        {
            Some(inner) => inner,
            None => Value::Object(fields),
        },
        other => other,
    };

    serde_json::from_value(inner).map_err(|source| Error::Json { kind, source })
}
