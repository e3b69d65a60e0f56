//! Plan display - converge-specific UI

use super::Plan;
use crate::resource::Address;
use colored::Colorize;
use declarative::{AttributeChange, PlanAction};
use similar::{ChangeTag, TextDiff};

fn colored_symbol(action: PlanAction) -> colored::ColoredString {
    match action {
        PlanAction::NoOp => action.symbol().dimmed(),
        PlanAction::Create => action.symbol().green(),
        PlanAction::Update => action.symbol().yellow(),
        PlanAction::Replace => action.symbol().red(),
    }
}

/// Render one attribute change as a plan line (without color)
pub fn format_change<K: std::fmt::Display>(change: &AttributeChange<K>) -> String {
    let mut line = match &change.old {
        Some(old) => format!("{:<18} {} → {}", change.attribute.to_string(), old, change.new),
        None => format!("{:<18} {}", change.attribute.to_string(), change.new),
    };
    if change.forces_replacement {
        line.push_str(" # forces replacement");
    }
    line
}

/// Display a plan in a user-friendly format
pub fn display_plan<R>(
    address: &Address,
    plan: &Plan<R>,
    old_spec: Option<&str>,
    new_spec: Option<&str>,
) {
    println!();
    if plan.action == PlanAction::NoOp {
        println!("  {} {} is up to date", "✓".green(), address.to_string().bold());
        return;
    }

    println!(
        "  {} {} will be {}",
        colored_symbol(plan.action),
        address.to_string().bold(),
        plan.action.to_string().bold()
    );

    for change in plan.diff.changed_attributes() {
        let line = format_change(&change);
        if change.forces_replacement {
            println!("      {}", line.red());
        } else if change.new.is_computed() {
            println!("      {}", line.dimmed());
        } else {
            println!("      {line}");
        }
    }

    if let (Some(old), Some(new)) = (old_spec, new_spec) {
        let lines = spec_diff_lines(old, new);
        if !lines.is_empty() {
            println!();
            println!("    {}", "Spec changes:".dimmed());
            for (tag, text) in lines {
                match tag {
                    ChangeTag::Delete => println!("    {}", format!("-{text}").red()),
                    ChangeTag::Insert => println!("    {}", format!("+{text}").green()),
                    ChangeTag::Equal => println!("    {}", format!(" {text}").dimmed()),
                }
            }
        }
    }
    println!();
}

/// Changed lines between two spec texts, with one line of context
pub fn spec_diff_lines(old: &str, new: &str) -> Vec<(ChangeTag, String)> {
    let diff = TextDiff::from_lines(old, new);
    let mut lines = Vec::new();
    for group in diff.grouped_ops(1) {
        for op in group {
            for change in diff.iter_changes(&op) {
                lines.push((change.tag(), change.value().trim_end_matches('\n').to_string()));
            }
        }
    }
    lines
}

/// Display a one-line summary after planning or applying
pub fn display_summary(action: PlanAction) {
    let text = match action {
        PlanAction::NoOp => "No changes.".to_string(),
        PlanAction::Create => "Plan: 1 to add, 0 to change, 0 to destroy.".to_string(),
        PlanAction::Update => "Plan: 0 to add, 1 to change, 0 to destroy.".to_string(),
        PlanAction::Replace => "Plan: 1 to add, 0 to change, 1 to destroy.".to_string(),
    };
    println!("{}", text.bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Attribute;
    use declarative::{AttrValue, Staged};

    #[test]
    fn test_format_change() {
        let change = AttributeChange {
            attribute: Attribute::Namespace,
            old: Some(AttrValue::from("ns1")),
            new: Staged::Value(AttrValue::from("ns2")),
            forces_replacement: true,
        };
        let line = format_change(&change);
        assert!(line.starts_with("namespace"));
        assert!(line.contains("\"ns1\" → \"ns2\""));
        assert!(line.ends_with("# forces replacement"));
    }

    #[test]
    fn test_format_computed_change() {
        let change = AttributeChange {
            attribute: Attribute::ModifyIndex,
            old: None,
            new: Staged::Computed,
            forces_replacement: false,
        };
        assert!(format_change(&change).ends_with("(known after apply)"));
    }

    #[test]
    fn test_spec_diff_lines() {
        let old = "a\nb\nc\nd\ne\n";
        let new = "a\nb\nC\nd\ne\n";
        let lines = spec_diff_lines(old, new);
        assert_eq!(
            lines,
            vec![
                (ChangeTag::Equal, "b".to_string()),
                (ChangeTag::Delete, "c".to_string()),
                (ChangeTag::Insert, "C".to_string()),
                (ChangeTag::Equal, "d".to_string()),
            ]
        );
    }

    #[test]
    fn test_spec_diff_identical() {
        assert!(spec_diff_lines("a\n", "a\n").is_empty());
    }
}
