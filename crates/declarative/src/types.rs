//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace assumed when a resource does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Value of a single observable attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(u64),
    Str(String),
    List(Vec<String>),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// New value staged for an attribute during planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staged {
    /// Known before apply
    Value(AttrValue),
    /// Assigned by the remote system; unknown until after apply
    Computed,
}

impl Staged {
    /// Check if the value is only known after apply
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed)
    }

    /// The known value, if any
    pub fn value(&self) -> Option<&AttrValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Computed => None,
        }
    }
}

impl fmt::Display for Staged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => v.fmt(f),
            Self::Computed => f.write_str("(known after apply)"),
        }
    }
}

/// What applying a plan will do to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Nothing to do
    NoOp,
    /// Resource does not exist yet
    Create,
    /// Resource is updated in place
    Update,
    /// Resource is destroyed and created again
    Replace,
}

impl PlanAction {
    /// Check if applying would change anything
    pub fn is_change(self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Marker used when rendering plans
    pub fn symbol(self) -> &'static str {
        match self {
            Self::NoOp => " ",
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
        }
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoOp => "no changes",
            Self::Create => "create",
            Self::Update => "update in-place",
            Self::Replace => "replace",
        })
    }
}

/// Remote identity of a resource: namespace plus id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub namespace: String,
    pub id: String,
}

impl Identity {
    /// Create an identity, defaulting an empty namespace
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: if namespace.is_empty() {
                DEFAULT_NAMESPACE.to_string()
            } else {
                namespace
            },
            id: id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.id)
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was updated in place
    Modified,
    /// Resource was destroyed and created again
    Replaced,
    /// Resource was removed
    Removed,
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Replaced | Self::Removed
        )
    }
}

impl fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChange => f.write_str("unchanged"),
            Self::Created => f.write_str("created"),
            Self::Modified => f.write_str("modified"),
            Self::Replaced => f.write_str("replaced"),
            Self::Removed => f.write_str("removed"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}
