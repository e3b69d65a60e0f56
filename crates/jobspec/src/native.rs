//! Native spec format.
//!
//! A TOML document holding one labeled block whose keys are snake_case:
//!
//! ```toml
//! [job.web]
//! datacenters = ["dc1"]
//!
//! [job.web.group.frontend]
//! count = 2
//!
//! [job.web.group.frontend.task.nginx]
//! driver = "docker"
//! config = { image = "nginx:1.25" }
//! resources = { cpu = 200, memory_mb = 128 }
//! ```
//!
//! The document is translated into the API's JSON shape and decoded with the
//! same serde types as JSON specs.

use crate::error::{Error, Result};
use crate::SpecRecord;
use serde_json::{Map, Number, Value};

/// Keys whose tables hold user data; their keys are kept verbatim.
const FREEFORM: &[&str] = &["meta", "env", "config", "secrets", "parameters", "context"];

/// Labeled sub-blocks and the list field they become.
const LABELED: &[(&str, &str)] = &[("group", "TaskGroups"), ("task", "Tasks")];

/// Key parts spelled in capitals by the API.
const ACRONYMS: &[&str] = &["id", "cpu", "mb", "fs"];

pub(crate) fn parse<R: SpecRecord>(raw: &str) -> Result<R> {
    let kind = R::KIND;
    let doc: toml::Table =
        toml::from_str(raw).map_err(|source| Error::Native { kind, source })?;

    if let Some(found) = doc.keys().find(|k| k.as_str() != kind.block_name()) {
        return Err(Error::UnexpectedBlock {
            kind,
            found: found.clone(),
        });
    }

    let blocks = match doc.get(kind.block_name()) {
        Some(toml::Value::Table(blocks)) => blocks,
        Some(_) => {
            return Err(Error::NotATable {
                kind,
                label: String::new(),
            });
        }
        None => return Err(Error::BlockCount { kind, count: 0 }),
    };
    if blocks.len() != 1 {
        return Err(Error::BlockCount {
            kind,
            count: blocks.len(),
        });
    }

    let Some((label, body)) = blocks.iter().next() else {
        return Err(Error::BlockCount { kind, count: 0 });
    };
    let toml::Value::Table(body) = body else {
        return Err(Error::NotATable {
            kind,
            label: label.clone(),
        });
    };

    let mut record: R = serde_json::from_value(translate_table(body))
        .map_err(|source| Error::Json { kind, source })?;
    if record.id().is_empty() {
        record.set_id(label);
    }
    Ok(record)
}

/// Convert snake_case to the API's PascalCase (`plugin_id` -> `PluginID`).
pub(crate) fn pascal_case(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if ACRONYMS.contains(&part) {
                part.to_ascii_uppercase()
            } else {
                let mut chars = part.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_ascii_uppercase().to_string() + chars.as_str()
                })
            }
        })
        .collect()
}

fn translate_table(table: &toml::Table) -> Value {
    let mut out = Map::new();
    for (key, value) in table {
        if let Some((_, list_key)) = LABELED.iter().find(|(block, _)| block == key) {
            out.insert((*list_key).to_string(), translate_labeled(value));
        } else if FREEFORM.contains(&key.as_str()) {
            out.insert(pascal_case(key), verbatim(value));
        } else {
            out.insert(pascal_case(key), translate(value));
        }
    }
    Value::Object(out)
}

/// `group.<name> = {..}` tables become a list with `Name` set from the label.
fn translate_labeled(value: &toml::Value) -> Value {
    match value {
        toml::Value::Table(labeled) => Value::Array(
            labeled
                .iter()
                .map(|(label, body)| {
                    let mut item = translate(body);
                    if let Value::Object(fields) = &mut item {
                        fields
                            .entry("Name")
                            .or_insert_with(|| Value::String(label.clone()));
                    }
                    item
                })
                .collect(),
        ),
        other => translate(other),
    }
}

fn translate(value: &toml::Value) -> Value {
    match value {
        toml::Value::Table(table) => translate_table(table),
        toml::Value::Array(items) => Value::Array(items.iter().map(translate).collect()),
        scalar => verbatim(scalar),
    }
}

fn verbatim(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number((*i).into()),
        toml::Value::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(verbatim).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), verbatim(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomad_api::{CsiVolume, Job};

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("plugin_id"), "PluginID");
        assert_eq!(pascal_case("external_id"), "ExternalID");
        assert_eq!(pascal_case("memory_mb"), "MemoryMB");
        assert_eq!(pascal_case("fs_type"), "FSType");
        assert_eq!(pascal_case("cpu"), "CPU");
        assert_eq!(pascal_case("access_mode"), "AccessMode");
        assert_eq!(pascal_case("type"), "Type");
    }

    #[test]
    fn test_volume_block() {
        let raw = r#"
            [volume.mysql]
            name = "database"
            plugin_id = "aws-ebs0"
            external_id = "vol-0123"
            access_mode = "single-node-writer"
            attachment_mode = "file-system"

            [volume.mysql.mount_options]
            fs_type = "ext4"
            mount_flags = ["noatime"]

            [volume.mysql.parameters]
            "iops_per_gb" = "3"
        "#;
        let volume: CsiVolume = parse(raw).unwrap();
        assert_eq!(volume.id, "mysql");
        assert_eq!(volume.name, "database");
        assert_eq!(volume.plugin_id, "aws-ebs0");
        assert_eq!(volume.external_id, "vol-0123");
        assert_eq!(volume.mount_options.unwrap().fs_type, "ext4");
        // Free-form keys keep their spelling.
        assert_eq!(volume.parameters["iops_per_gb"], "3");
    }

    #[test]
    fn test_explicit_id_wins_over_label() {
        let raw = "[volume.label]\nid = \"real-id\"\nplugin_id = \"p\"\n";
        let volume: CsiVolume = parse(raw).unwrap();
        assert_eq!(volume.id, "real-id");
    }

    #[test]
    fn test_job_groups_and_tasks() {
        let raw = r#"
            [job.web]
            datacenters = ["dc1"]
            meta = { owner_team = "platform" }

            [job.web.group.frontend]
            count = 2

            [job.web.group.frontend.task.nginx]
            driver = "docker"
            config = { image = "nginx:1.25", port_map = { http = 80 } }
            env = { LOG_LEVEL = "info" }
            resources = { cpu = 200, memory_mb = 128 }
        "#;
        let job: Job = parse(raw).unwrap();
        assert_eq!(job.id, "web");
        assert_eq!(job.meta["owner_team"], "platform");
        let group = &job.task_groups[0];
        assert_eq!(group.name, "frontend");
        assert_eq!(group.count, Some(2));
        let task = &group.tasks[0];
        assert_eq!(task.name, "nginx");
        assert_eq!(task.config["port_map"]["http"], 80);
        assert_eq!(task.env["LOG_LEVEL"], "info");
        assert_eq!(task.resources.as_ref().unwrap().memory_mb, Some(128));
    }

    #[test]
    fn test_wrong_block_kind() {
        let err = parse::<Job>("[volume.mysql]\nplugin_id = \"p\"\n").unwrap_err();
        assert!(matches!(err, Error::UnexpectedBlock { .. }));
    }

    #[test]
    fn test_two_blocks_rejected() {
        let err = parse::<Job>("[job.a]\n[job.b]\n").unwrap_err();
        assert!(matches!(err, Error::BlockCount { count: 2, .. }));
    }

    #[test]
    fn test_no_block_rejected() {
        let err = parse::<Job>("").unwrap_err();
        assert!(matches!(err, Error::BlockCount { count: 0, .. }));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse::<Job>("[job.web\n").unwrap_err();
        assert!(matches!(err, Error::Native { .. }));
    }
}
