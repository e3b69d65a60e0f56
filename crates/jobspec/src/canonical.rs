//! Canonical forms for spec comparison.
//!
//! Two specs are equivalent when their canonical forms are equal: every
//! default the server would fill in is filled in, and every list whose order
//! carries no meaning is sorted.

use crate::{SpecFormat, SpecRecord, parse};
use nomad_api::{CsiVolume, DEFAULT_NAMESPACE, Job, Resources, Task, TaskGroup};

pub const DEFAULT_JOB_TYPE: &str = "service";
pub const DEFAULT_REGION: &str = "global";
pub const DEFAULT_PRIORITY: u32 = 50;
pub const DEFAULT_DATACENTER: &str = "*";
pub const DEFAULT_COUNT: u32 = 1;
pub const DEFAULT_CPU: u32 = 100;
pub const DEFAULT_MEMORY_MB: u32 = 300;

/// Normalization to a canonical form.
///
/// Implementations must be idempotent.
pub trait Canonicalize {
    /// Normalize in place.
    fn canonicalize(&mut self);

    /// Normalize by value.
    #[must_use]
    fn canonicalized(mut self) -> Self
    where
        Self: Sized,
    {
        self.canonicalize();
        self
    }
}

/// Whether two native-format spec texts describe the same resource.
///
/// Either side failing to parse makes the pair unequal.
pub fn equivalent<R: SpecRecord>(old: &str, new: &str) -> bool {
    let (Ok(old), Ok(new)) = (
        parse::<R>(old, SpecFormat::Native),
        parse::<R>(new, SpecFormat::Native),
    ) else {
        return false;
    };
    old.canonicalized() == new.canonicalized()
}

fn default_if_empty(value: &mut String, default: &str) {
    if value.is_empty() {
        *value = default.to_string();
    }
}

fn sort_dedup(values: &mut Vec<String>) {
    values.sort();
    values.dedup();
}

impl Canonicalize for CsiVolume {
    fn canonicalize(&mut self) {
        if self.name.is_empty() {
            self.name = self.id.clone();
        }
        default_if_empty(&mut self.namespace, DEFAULT_NAMESPACE);

        if let Some(mount) = &mut self.mount_options {
            sort_dedup(&mut mount.mount_flags);
        }
        if self.mount_options.as_ref().is_some_and(|m| m.is_empty()) {
            self.mount_options = None;
        }
    }
}

impl Canonicalize for Job {
    fn canonicalize(&mut self) {
        if self.name.is_empty() {
            self.name = self.id.clone();
        }
        default_if_empty(&mut self.namespace, DEFAULT_NAMESPACE);
        self.job_type
            .get_or_insert_with(|| DEFAULT_JOB_TYPE.to_string());
        self.region.get_or_insert_with(|| DEFAULT_REGION.to_string());
        self.priority.get_or_insert(DEFAULT_PRIORITY);

        if self.datacenters.is_empty() {
            self.datacenters.push(DEFAULT_DATACENTER.to_string());
        }
        sort_dedup(&mut self.datacenters);

        for group in &mut self.task_groups {
            group.canonicalize();
        }
        self.task_groups.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

impl Canonicalize for TaskGroup {
    fn canonicalize(&mut self) {
        self.count.get_or_insert(DEFAULT_COUNT);
        for task in &mut self.tasks {
            task.canonicalize();
        }
        self.tasks.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

impl Canonicalize for Task {
    fn canonicalize(&mut self) {
        let resources = self.resources.get_or_insert_with(Resources::default);
        resources.cpu.get_or_insert(DEFAULT_CPU);
        resources.memory_mb.get_or_insert(DEFAULT_MEMORY_MB);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomad_api::CsiMountOptions;

    const WEB: &str = r#"
        [job.web]
        datacenters = ["dc2", "dc1"]

        [job.web.group.frontend.task.nginx]
        driver = "docker"
        config = { image = "nginx:1.25" }
    "#;

    const MYSQL: &str = r#"
        [volume.mysql]
        plugin_id = "aws-ebs0"
        access_mode = "single-node-writer"
        attachment_mode = "file-system"
    "#;

    #[test]
    fn test_job_defaults() {
        let job: Job = parse::<Job>(WEB, SpecFormat::Native).unwrap().canonicalized();
        assert_eq!(job.name, "web");
        assert_eq!(job.namespace, "default");
        assert_eq!(job.job_type.as_deref(), Some("service"));
        assert_eq!(job.region.as_deref(), Some("global"));
        assert_eq!(job.priority, Some(50));
        assert_eq!(job.datacenters, vec!["dc1".to_string(), "dc2".to_string()]);

        let group = &job.task_groups[0];
        assert_eq!(group.count, Some(1));
        assert_eq!(
            group.tasks[0].resources,
            Some(Resources {
                cpu: Some(100),
                memory_mb: Some(300)
            })
        );
    }

    #[test]
    fn test_job_without_datacenters_gets_wildcard() {
        let job = Job {
            id: "batch".to_string(),
            ..Default::default()
        }
        .canonicalized();
        assert_eq!(job.datacenters, vec!["*".to_string()]);
    }

    #[test]
    fn test_partial_resources_filled() {
        let mut task = Task {
            name: "app".to_string(),
            resources: Some(Resources {
                cpu: Some(500),
                memory_mb: None,
            }),
            ..Default::default()
        };
        task.canonicalize();
        assert_eq!(
            task.resources,
            Some(Resources {
                cpu: Some(500),
                memory_mb: Some(300)
            })
        );
    }

    #[test]
    fn test_groups_and_tasks_ordered_by_name() {
        let mut job = Job {
            id: "web".to_string(),
            task_groups: vec![
                TaskGroup {
                    name: "b".to_string(),
                    tasks: vec![
                        Task {
                            name: "z".to_string(),
                            ..Default::default()
                        },
                        Task {
                            name: "a".to_string(),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                TaskGroup {
                    name: "a".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        job.canonicalize();
        assert_eq!(job.task_groups[0].name, "a");
        assert_eq!(job.task_groups[1].tasks[0].name, "a");
    }

    #[test]
    fn test_volume_defaults() {
        let volume = CsiVolume {
            id: "mysql".to_string(),
            mount_options: Some(CsiMountOptions::default()),
            ..Default::default()
        }
        .canonicalized();
        assert_eq!(volume.name, "mysql");
        assert_eq!(volume.namespace, "default");
        assert!(volume.mount_options.is_none());
    }

    #[test]
    fn test_mount_flags_sorted() {
        let volume = CsiVolume {
            id: "mysql".to_string(),
            mount_options: Some(CsiMountOptions {
                fs_type: String::new(),
                mount_flags: vec!["rw".to_string(), "noatime".to_string(), "rw".to_string()],
            }),
            ..Default::default()
        }
        .canonicalized();
        assert_eq!(
            volume.mount_options.unwrap().mount_flags,
            vec!["noatime".to_string(), "rw".to_string()]
        );
    }

    #[test]
    fn test_idempotent() {
        let job: Job = parse(WEB, SpecFormat::Native).unwrap();
        let once = job.canonicalized();
        let twice = once.clone().canonicalized();
        assert_eq!(once, twice);

        let volume: CsiVolume = parse(MYSQL, SpecFormat::Native).unwrap();
        let once = volume.canonicalized();
        let twice = once.clone().canonicalized();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_equivalent_reflexive() {
        assert!(equivalent::<Job>(WEB, WEB));
        assert!(equivalent::<CsiVolume>(MYSQL, MYSQL));
    }

    #[test]
    fn test_equivalent_ignores_defaults_and_order() {
        let explicit = r#"
            [job.web]
            name = "web"
            namespace = "default"
            type = "service"
            region = "global"
            priority = 50
            datacenters = ["dc1", "dc2", "dc1"]

            [job.web.group.frontend]
            count = 1

            [job.web.group.frontend.task.nginx]
            driver = "docker"
            config = { image = "nginx:1.25" }
            resources = { cpu = 100, memory_mb = 300 }
        "#;
        assert!(equivalent::<Job>(WEB, explicit));
        assert!(equivalent::<Job>(explicit, WEB));
    }

    #[test]
    fn test_equivalent_detects_change() {
        let changed = WEB.replace("nginx:1.25", "nginx:1.27");
        assert!(!equivalent::<Job>(WEB, &changed));
        assert!(!equivalent::<Job>(&changed, WEB));
    }

    #[test]
    fn test_unparseable_side_is_not_equivalent() {
        assert!(!equivalent::<Job>(WEB, "[job.web"));
        assert!(!equivalent::<Job>("[job.web", WEB));
        assert!(!equivalent::<Job>("[job.web", "[job.web"));
    }

    #[test]
    fn test_json_input_is_not_native() {
        let json = r#"{"ID": "web"}"#;
        assert!(!equivalent::<Job>(json, json));
    }
}
