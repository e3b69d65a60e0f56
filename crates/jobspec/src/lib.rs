//! # jobspec
//!
//! Parsing and canonicalization of Nomad job and CSI volume specs.
//!
//! Specs come in two formats: the JSON the Nomad API speaks (optionally
//! wrapped in a `{"Job": {...}}` envelope) and a native TOML format with
//! snake_case keys. Both decode into the `nomad-api` wire types.
//!
//! ## Example
//!
//! ```
//! use jobspec::{Canonicalize, SpecFormat};
//! use nomad_api::CsiVolume;
//!
//! let raw = r#"
//!     [volume.mysql]
//!     plugin_id = "aws-ebs0"
//! "#;
//! let volume: CsiVolume = jobspec::parse(raw, SpecFormat::Native).unwrap();
//! assert_eq!(volume.canonicalized().namespace, "default");
//! ```

pub mod canonical;
pub mod error;
mod native;
mod parser;

pub use canonical::{Canonicalize, equivalent};
pub use error::{Error, Result};
pub use parser::{parse, parse_file};

use nomad_api::{CsiVolume, Job};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Input format of a spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpecFormat {
    /// TOML with one labeled `[job.<id>]` or `[volume.<id>]` block.
    #[default]
    Native,
    /// Nomad API JSON.
    Json,
}

impl SpecFormat {
    /// JSON when `json` is set, native otherwise.
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Native }
    }
}

/// Kind of resource a spec describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    Job,
    Volume,
}

impl SpecKind {
    /// Top-level block name in the native format.
    pub fn block_name(self) -> &'static str {
        match self {
            SpecKind::Job => "job",
            SpecKind::Volume => "volume",
        }
    }

    /// JSON envelope keys that are unwrapped before decoding.
    pub fn envelopes(self) -> &'static [&'static str] {
        match self {
            SpecKind::Job => &["Job"],
            SpecKind::Volume => &["Job", "Volume"],
        }
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.block_name())
    }
}

/// A record a spec can decode into.
pub trait SpecRecord:
    DeserializeOwned + Serialize + Default + Clone + PartialEq + fmt::Debug + Canonicalize
{
    const KIND: SpecKind;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: &str);

    /// Name, falling back to the id the server would use for it.
    fn name(&self) -> &str;

    fn namespace(&self) -> &str;

    fn set_namespace(&mut self, namespace: &str);
}

impl SpecRecord for Job {
    const KIND: SpecKind = SpecKind::Job;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn set_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
    }
}

impl SpecRecord for CsiVolume {
    const KIND: SpecKind = SpecKind::Volume;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn set_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
    }
}
