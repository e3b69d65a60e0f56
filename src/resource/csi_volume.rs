//! CSI volume resource

use super::{Attribute, Details, ObservedRecord, ResourceKind, ResourceSettings, ResourceType};
use declarative::Identity;
use nomad_api::{Client, CsiMountOptions, CsiVolume};

/// A CSI volume registered with `PUT /v1/volume/csi/:id`
pub struct CsiVolumeKind;

impl ResourceKind for CsiVolumeKind {
    type Record = CsiVolume;

    const TYPE: ResourceType = ResourceType::Volume;

    const COMPUTED: &'static [Attribute] = &[
        Attribute::Id,
        Attribute::ModifyIndex,
        Attribute::Namespace,
        Attribute::Type,
        Attribute::Name,
        Attribute::ExternalId,
        Attribute::PluginId,
        Attribute::AccessMode,
        Attribute::AttachmentMode,
        Attribute::MountOptions,
    ];

    fn register(
        client: &Client,
        record: &CsiVolume,
        namespace: &str,
    ) -> nomad_api::Result<Option<String>> {
        client.register_volume(record, namespace)?;
        log::debug!("volume '{}' registered", record.id);
        Ok(None)
    }

    fn read(client: &Client, identity: &Identity) -> nomad_api::Result<ObservedRecord> {
        log::debug!("reading volume {identity}");
        let volume = client.volume_info(&identity.id, &identity.namespace)?;
        Ok(observe(&volume))
    }

    fn deregister(
        client: &Client,
        identity: &Identity,
        _settings: &ResourceSettings,
    ) -> nomad_api::Result<()> {
        log::debug!("deregistering volume {identity}");
        client.deregister_volume(&identity.id, &identity.namespace)
    }
}

/// Convert a remote volume into its observed record
pub fn observe(volume: &CsiVolume) -> ObservedRecord {
    ObservedRecord {
        id: volume.id.clone(),
        name: volume.name.clone(),
        namespace: volume.namespace.clone(),
        modify_index: volume.modify_index,
        create_index: volume.create_index,
        allocation_ids: volume.allocations.iter().map(|a| a.id.clone()).collect(),
        details: Details::Volume {
            external_id: volume.external_id.clone(),
            plugin_id: volume.plugin_id.clone(),
            access_mode: volume.access_mode.clone(),
            attachment_mode: volume.attachment_mode.clone(),
            mount_options: volume
                .mount_options
                .as_ref()
                .filter(|m| !m.is_empty())
                .map(format_mount_options),
        },
    }
}

/// Render mount options as `fs_type [flag,flag]`
pub fn format_mount_options(mount: &CsiMountOptions) -> String {
    match (mount.fs_type.is_empty(), mount.mount_flags.is_empty()) {
        (_, true) => mount.fs_type.clone(),
        (true, false) => format!("[{}]", mount.mount_flags.join(",")),
        (false, false) => format!("{} [{}]", mount.fs_type, mount.mount_flags.join(",")),
    }
}
