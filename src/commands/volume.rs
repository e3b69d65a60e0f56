//! Read-only lookup of a CSI volume converge does not manage

use anyhow::Result;
use nomad_api::{Client, CsiVolume, namespace_or_default};
use serde::Serialize;

use super::Session;
use crate::Context;
use crate::cli::VolumeArgs;
use crate::resource::csi_volume::format_mount_options;
use crate::ui;

/// Attributes reported for a looked-up volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeView {
    pub id: String,
    pub volume_id: String,
    pub namespace: String,
    pub name: String,
    #[serde(rename = "type")]
    pub volume_type: &'static str,
    pub external_id: String,
    pub plugin_id: String,
    pub access_mode: String,
    pub attachment_mode: String,
    pub mount_options: Option<String>,
    pub create_index: u64,
    pub modify_index: u64,
}

impl From<CsiVolume> for VolumeView {
    fn from(volume: CsiVolume) -> Self {
        let mount_options = volume
            .mount_options
            .as_ref()
            .filter(|m| !m.is_empty())
            .map(format_mount_options);
        Self {
            volume_id: volume.id.clone(),
            id: volume.id,
            namespace: volume.namespace,
            name: volume.name,
            volume_type: "csi",
            external_id: volume.external_id,
            plugin_id: volume.plugin_id,
            access_mode: volume.access_mode,
            attachment_mode: volume.attachment_mode,
            mount_options,
            create_index: volume.create_index,
            modify_index: volume.modify_index,
        }
    }
}

pub fn run(ctx: &Context, args: VolumeArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let view = lookup(&session.client, &args.id, &args.namespace)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    ui::header(&format!("volume {}", view.id));
    ui::kv("namespace", &view.namespace);
    ui::kv("name", ui::or_dash(&view.name));
    ui::kv("type", view.volume_type);
    ui::kv("plugin_id", &view.plugin_id);
    ui::kv("external_id", ui::or_dash(&view.external_id));
    ui::kv("access_mode", ui::or_dash(&view.access_mode));
    ui::kv("attachment_mode", ui::or_dash(&view.attachment_mode));
    ui::kv("mount_options", view.mount_options.as_deref().unwrap_or("-"));
    ui::kv("create_index", &view.create_index.to_string());
    ui::kv("modify_index", &view.modify_index.to_string());
    Ok(())
}

/// Look up a volume; unlike a managed read, a missing volume is an error.
pub fn lookup(client: &Client, id: &str, namespace: &str) -> Result<VolumeView> {
    let namespace = namespace_or_default(namespace);
    log::debug!("Looking up volume '{id}' in namespace '{namespace}'");

    match client.volume_info(id, namespace) {
        Ok(volume) => Ok(volume.into()),
        Err(e) if e.is_not_found() => {
            anyhow::bail!("volume '{id}' not found in namespace '{namespace}': {e}")
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("error checking for volume '{id}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomad_api::{CsiMountOptions, Error, MockBackend, Operation};

    fn setup() -> (MockBackend, Client) {
        let mock = MockBackend::new();
        let client = Client::with_backend(Box::new(mock.clone()));
        (mock, client)
    }

    #[test]
    fn test_lookup_found() {
        let (mock, client) = setup();
        mock.insert_volume(CsiVolume {
            id: "mysql".to_string(),
            name: "mysql".to_string(),
            namespace: "default".to_string(),
            plugin_id: "aws-ebs0".to_string(),
            external_id: "vol-0abc".to_string(),
            mount_options: Some(CsiMountOptions {
                fs_type: "ext4".to_string(),
                mount_flags: vec!["noatime".to_string()],
            }),
            create_index: 4,
            modify_index: 8,
            ..Default::default()
        });

        let view = lookup(&client, "mysql", "").unwrap();

        assert_eq!(view.id, "mysql");
        assert_eq!(view.volume_id, "mysql");
        assert_eq!(view.volume_type, "csi");
        assert_eq!(view.external_id, "vol-0abc");
        assert_eq!(view.create_index, 4);
        assert_eq!(view.mount_options.as_deref(), Some("ext4 [noatime]"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "csi");
    }

    #[test]
    fn test_lookup_missing_is_error() {
        let (_, client) = setup();
        let err = lookup(&client, "mysql", "prod").unwrap_err();
        assert!(err.to_string().contains("not found in namespace 'prod'"));
    }

    #[test]
    fn test_lookup_server_error() {
        let (mock, client) = setup();
        mock.fail(Operation::VolumeInfo, Error::status(500, "internal"));
        let err = lookup(&client, "mysql", "default").unwrap_err();
        assert!(err.to_string().contains("error checking for volume 'mysql'"));
    }
}
