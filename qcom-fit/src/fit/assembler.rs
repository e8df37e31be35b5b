//! Configuration assembly.
//!
//! Turns the registered device-tree sections and the board metadata into the
//! ordered list of FIT configurations. Two policies are supported:
//!
//! * [`Mode::PerBlobFanout`]: one configuration per compatible string of every
//!   bootable blob, overlays included. No multi-blob configurations.
//! * [`Mode::MetadataDrivenGrouping`]: for each base in `KERNEL_DEVICETREE`,
//!   one base-only configuration followed by one configuration per overlay
//!   group declared in `OVERLAY_DTBOS`.
//!
//! In both modes numbering is global and gap-free, and output order follows
//! registration order and metadata declaration order only.

use crate::{
    context::ImageBuildContext,
    error::{FitError, Result},
    fit::{
        node::{DTB_EXT, DTBO_EXT, DeviceTreeRef, base_node_id, blob_name},
        registry::DeviceTreeRegistry,
        types::{ConfigurationEntry, Configurations},
    },
    metadata::{BoardMetadata, MetadataLookup},
};

pub const DEFAULT_START_INDEX: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    PerBlobFanout,
    MetadataDrivenGrouping {
        /// Name of the metadata-only DTB in `KERNEL_DEVICETREE`
        metadata_dtb: String,
    },
}

pub struct Assembler<'a> {
    mode: Mode,
    ctx: &'a ImageBuildContext,
    start_index: u32,
}

impl<'a> Assembler<'a> {
    pub fn new(mode: Mode, ctx: &'a ImageBuildContext) -> Self {
        Self {
            mode,
            ctx,
            start_index: DEFAULT_START_INDEX,
        }
    }

    /// First configuration index; 0 reproduces the legacy numbering.
    pub fn start_index(mut self, index: u32) -> Self {
        self.start_index = index;
        self
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Build the configurations and mark the default.
    ///
    /// With `default_selector` the default is `<prefix><selector>` and must
    /// name an emitted configuration; otherwise it is the first one. When no
    /// device tree yields a configuration, a single kernel-only configuration
    /// is emitted so the image stays bootable, and it is the default whatever
    /// the selector says.
    pub fn assemble<M>(
        &self,
        registry: &DeviceTreeRegistry,
        metadata: &M,
        default_selector: Option<&str>,
    ) -> Result<Configurations>
    where
        M: MetadataLookup + ?Sized,
    {
        let mut emitter = Emitter::new(self.ctx, self.start_index);

        match &self.mode {
            Mode::PerBlobFanout => fan_out(registry, &mut emitter)?,
            Mode::MetadataDrivenGrouping { metadata_dtb } => group_by_metadata(
                registry,
                &BoardMetadata::new(metadata),
                metadata_dtb,
                &mut emitter,
            )?,
        }

        if emitter.entries.is_empty() {
            debug!("no bootable device trees, emitting a kernel-only configuration");
            emitter.push(None, Vec::new())?;
            if let Some(selector) = default_selector {
                warn!("no device trees, ignoring default configuration selector {selector}");
            }
            return emitter.finish(None);
        }

        emitter.finish(default_selector)
    }
}

fn fan_out(registry: &DeviceTreeRegistry, emitter: &mut Emitter<'_>) -> Result<()> {
    for node in registry.bootable() {
        let fdt = DeviceTreeRef::single(node.id.clone());
        if node.compatible.is_empty() {
            emitter.push(Some(fdt), Vec::new())?;
            continue;
        }
        for compatible in &node.compatible {
            emitter.push(Some(fdt.clone()), vec![compatible.clone()])?;
        }
    }
    Ok(())
}

fn group_by_metadata<M>(
    registry: &DeviceTreeRegistry,
    board: &BoardMetadata<'_, M>,
    metadata_dtb: &str,
    emitter: &mut Emitter<'_>,
) -> Result<()>
where
    M: MetadataLookup + ?Sized,
{
    for entry in board.kernel_devicetree() {
        let name = blob_name(&entry);
        if name == metadata_dtb {
            continue;
        }
        if name.ends_with(DTBO_EXT) {
            debug!("{name}: overlays only appear through OVERLAY_DTBOS");
            continue;
        }

        let key = name.strip_suffix(DTB_EXT).unwrap_or(name);
        let base_id = base_node_id(name);
        let base_compatible = match board.dtb_compatible(key) {
            Some(compatible) => compatible.split_whitespace().map(String::from).collect(),
            None => registry
                .get(&base_id)
                .map(|n| n.compatible.clone())
                .unwrap_or_default(),
        };

        emitter.push(
            Some(DeviceTreeRef::single(base_id.clone())),
            base_compatible.clone(),
        )?;

        let group_compatibles = board.dtbo_compatibles(key);
        for (idx, group) in board.overlay_groups(key).into_iter().enumerate() {
            let mut ids = Vec::with_capacity(group.overlays().len() + 1);
            ids.push(base_id.clone());
            ids.extend(group.into_overlays());

            let compatible = match group_compatibles.get(idx) {
                Some(c) => vec![c.clone()],
                None => base_compatible.clone(),
            };
            emitter.push(Some(DeviceTreeRef::group(ids)?), compatible)?;
        }
    }
    Ok(())
}

/// Names and collects entries with a global running index
struct Emitter<'a> {
    ctx: &'a ImageBuildContext,
    /// `None` once the index space is used up
    next_index: Option<u32>,
    entries: Vec<ConfigurationEntry>,
}

impl<'a> Emitter<'a> {
    fn new(ctx: &'a ImageBuildContext, start_index: u32) -> Self {
        Self {
            ctx,
            next_index: Some(start_index),
            entries: Vec::new(),
        }
    }

    fn push(&mut self, fdt: Option<DeviceTreeRef>, compatible: Vec<String>) -> Result<()> {
        let index = self.next_index.ok_or_else(|| {
            FitError::invalid_argument("configuration index exceeds u32::MAX")
        })?;
        let mut entry = ConfigurationEntry::new(self.ctx.conf_name(index));
        if let Some(fdt) = fdt {
            entry = entry.with_fdt(fdt);
        }
        self.next_index = index.checked_add(1);
        self.entries.push(entry.with_compatible(compatible));
        Ok(())
    }

    fn finish(mut self, default_selector: Option<&str>) -> Result<Configurations> {
        let default = match default_selector {
            Some(selector) => self.ctx.conf_name(selector),
            None => match self.entries.first() {
                Some(first) => first.name.clone(),
                None => return Err(FitError::invalid_argument("no configurations to choose from")),
            },
        };

        let entry = self
            .entries
            .iter_mut()
            .find(|c| c.name == default)
            .ok_or_else(|| FitError::unknown_default(default.clone()))?;
        entry.is_default = true;

        info!(
            "assembled {} configuration(s), default {default}",
            self.entries.len()
        );
        Ok(Configurations {
            default,
            entries: self.entries,
        })
    }
}
