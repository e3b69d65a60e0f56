//! Attribute-level diffs between observed and desired state
//!
//! A [`ResourceDiff`] holds the old value of every observed attribute and
//! lets a planner stage new values, mark values as computed by the remote
//! system, and flag attributes whose change forces replacement.

use crate::types::{AttrValue, PlanAction, Staged};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Staged changes for one resource, keyed by attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDiff<K: Ord> {
    old: BTreeMap<K, AttrValue>,
    new: BTreeMap<K, Staged>,
    force_new: BTreeSet<K>,
}

impl<K: Ord> Default for ResourceDiff<K> {
    fn default() -> Self {
        Self {
            old: BTreeMap::new(),
            new: BTreeMap::new(),
            force_new: BTreeSet::new(),
        }
    }
}

/// A single attribute change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange<K> {
    pub attribute: K,
    pub old: Option<AttrValue>,
    pub new: Staged,
    pub forces_replacement: bool,
}

impl<K: Ord + Copy> ResourceDiff<K> {
    /// Start a diff from previously observed attribute values
    pub fn new(old: impl IntoIterator<Item = (K, AttrValue)>) -> Self {
        Self {
            old: old.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Observed value before the change
    pub fn get_old(&self, key: K) -> Option<&AttrValue> {
        self.old.get(&key)
    }

    /// Value after the change: the staged one if any, otherwise the old one
    pub fn get(&self, key: K) -> Option<Staged> {
        match self.new.get(&key) {
            Some(staged) => Some(staged.clone()),
            None => self.old.get(&key).cloned().map(Staged::Value),
        }
    }

    /// Stage a known new value
    pub fn set_new(&mut self, key: K, value: impl Into<AttrValue>) {
        self.new.insert(key, Staged::Value(value.into()));
    }

    /// Stage a value the remote system will assign
    pub fn set_new_computed(&mut self, key: K) {
        self.new.insert(key, Staged::Computed);
    }

    /// Flag that changing this attribute forces replacement.
    ///
    /// Has no effect when the attribute does not actually change.
    pub fn force_new(&mut self, key: K) {
        self.force_new.insert(key);
    }

    /// Check if an attribute is staged to a different value
    pub fn has_change(&self, key: K) -> bool {
        match self.new.get(&key) {
            Some(Staged::Computed) => true,
            Some(Staged::Value(v)) => self.old.get(&key) != Some(v),
            None => false,
        }
    }

    /// Check if an attribute is marked computed
    pub fn is_computed(&self, key: K) -> bool {
        matches!(self.new.get(&key), Some(Staged::Computed))
    }

    /// Check if an attribute was flagged as forcing replacement
    pub fn is_force_new(&self, key: K) -> bool {
        self.force_new.contains(&key)
    }

    /// Check if any flagged attribute actually changes
    pub fn requires_replacement(&self) -> bool {
        self.force_new.iter().any(|key| self.has_change(*key))
    }

    /// Attributes marked computed
    pub fn computed_attributes(&self) -> Vec<K> {
        self.new
            .iter()
            .filter(|(_, staged)| staged.is_computed())
            .map(|(key, _)| *key)
            .collect()
    }

    /// Every staged attribute whose value changes
    pub fn changed_attributes(&self) -> Vec<AttributeChange<K>> {
        self.new
            .iter()
            .filter(|(key, _)| self.has_change(**key))
            .map(|(key, staged)| AttributeChange {
                attribute: *key,
                old: self.old.get(key).cloned(),
                new: staged.clone(),
                forces_replacement: self.force_new.contains(key),
            })
            .collect()
    }

    /// Check if nothing changes
    pub fn is_empty(&self) -> bool {
        self.changed_attributes().is_empty()
    }

    /// Action implied by the staged changes for an existing resource
    pub fn action(&self) -> PlanAction {
        if self.requires_replacement() {
            PlanAction::Replace
        } else if self.is_empty() {
            PlanAction::NoOp
        } else {
            PlanAction::Update
        }
    }
}

impl<K: fmt::Display> fmt::Display for AttributeChange<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old {
            Some(old) => write!(f, "{}: {} => {}", self.attribute, old, self.new)?,
            None => write!(f, "{}: {}", self.attribute, self.new)?,
        }
        if self.forces_replacement {
            f.write_str(" (forces replacement)")?;
        }
        Ok(())
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub replacements: usize,
    pub modifications: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Count plan actions
    pub fn from_actions(actions: impl IntoIterator<Item = PlanAction>) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action {
                PlanAction::Create => summary.additions += 1,
                PlanAction::Replace => summary.replacements += 1,
                PlanAction::Update => summary.modifications += 1,
                PlanAction::NoOp => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.replacements + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
