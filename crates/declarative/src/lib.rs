//! # Declarative
//!
//! Building blocks for reconciling a declared resource with a remote system.
//!
//! This crate knows nothing about any particular remote API. It provides the
//! pieces a planner and an apply loop share.
//!
//! ## Core Concepts
//!
//! - **ResourceDiff**: old attribute values plus staged new values, computed
//!   markers and force-replacement flags
//! - **PlanAction**: what applying a diff does (create, update, replace)
//! - **Identity**: namespace plus id, with the default namespace filled in
//! - **wait**: repeated sampling of a remote object with backoff and timeout
//!
//! ## Example
//!
//! ```
//! use declarative::{AttrValue, PlanAction, ResourceDiff};
//!
//! let mut diff = ResourceDiff::new([("namespace", AttrValue::from("ns1"))]);
//! diff.set_new("namespace", "ns2");
//! diff.force_new("namespace");
//! assert_eq!(diff.action(), PlanAction::Replace);
//! ```
//!
//! ## Provider Traits
//!
//! - [`ConfirmCallback`]: Handles user confirmations
//! - [`WaitCallback`]: Receives progress while waiting
//! - [`wait::Refresh`]: Samples remote state once per call

pub mod context;
pub mod diff;
pub mod types;
pub mod wait;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, WaitCallback};
pub use diff::{AttributeChange, DiffSummary, ResourceDiff};
pub use types::{AttrValue, ApplyResult, DEFAULT_NAMESPACE, Identity, PlanAction, Staged};
pub use wait::{Progress, Refresh, WaitError, WaitOptions, wait_for_state};
