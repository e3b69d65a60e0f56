//! Error types for spec parsing.

use crate::SpecKind;
use std::io;
use std::path::PathBuf;

/// Result type alias for spec parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing a spec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The JSON input is malformed or has the wrong shape.
    #[error("error parsing {kind}spec: {source}")]
    Json {
        kind: SpecKind,
        #[source]
        source: serde_json::Error,
    },

    /// The native input is malformed.
    #[error("error parsing {kind}spec: {source}")]
    Native {
        kind: SpecKind,
        #[source]
        source: toml::de::Error,
    },

    /// The native input has a top-level block for another kind.
    #[error("error parsing {kind}spec: unexpected top-level block `{found}`")]
    UnexpectedBlock { kind: SpecKind, found: String },

    /// The native input does not declare exactly one resource.
    #[error("error parsing {kind}spec: expected exactly one `{kind}` block, found {count}")]
    BlockCount { kind: SpecKind, count: usize },

    /// A labeled block is not a table.
    #[error("error parsing {kind}spec: `{kind}.{label}` must be a table")]
    NotATable { kind: SpecKind, label: String },

    /// The input decoded to an empty record.
    #[error("error parsing {kind}spec: input is not a valid Nomad {kind}spec")]
    Empty { kind: SpecKind },

    /// The spec file could not be read.
    #[error("error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// The kind of spec that failed, if known.
    pub fn kind(&self) -> Option<SpecKind> {
        match self {
            Error::Json { kind, .. }
            | Error::Native { kind, .. }
            | Error::UnexpectedBlock { kind, .. }
            | Error::BlockCount { kind, .. }
            | Error::NotATable { kind, .. }
            | Error::Empty { kind } => Some(*kind),
            Error::Io { .. } => None,
        }
    }
}
