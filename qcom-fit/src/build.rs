//! End-to-end image build: register blobs, assemble configurations, package.

use std::{collections::HashSet, path::Path};

use crate::{
    config::{AssemblyMode, FitBuildConfig},
    context::ImageBuildContext,
    dtc::{CompatibleReader, Fdtget},
    error::Result,
    fit::{
        Assembler, Configurations, DeviceTreeRegistry, FitDescriptor, NodeKind,
        node::{DTB_EXT, FDT_PREFIX, blob_name},
    },
    metadata::BoardMetadata,
    packager::{ImagePackager, Mkimage},
};

pub struct FitBuild {
    config: FitBuildConfig,
    ctx: ImageBuildContext,
}

impl FitBuild {
    pub fn new(config: FitBuildConfig) -> Self {
        let ctx = config.context();
        Self { config, ctx }
    }

    pub fn config(&self) -> &FitBuildConfig {
        &self.config
    }

    pub fn context(&self) -> &ImageBuildContext {
        &self.ctx
    }

    /// Registry populated with `fdtget` as the compatible reader
    pub fn registry(&self) -> Result<DeviceTreeRegistry> {
        self.registry_with_reader(Fdtget::new(&self.config.fdtget))
    }

    /// Register every blob of the image.
    ///
    /// `KERNEL_DEVICETREE` entries come first, in order. In metadata-driven
    /// mode the overlays named by `OVERLAY_DTBOS` follow, once each, so that
    /// every overlay a configuration references has an image node.
    pub fn registry_with_reader(
        &self,
        reader: impl CompatibleReader + 'static,
    ) -> Result<DeviceTreeRegistry> {
        let config = &self.config;
        let board = BoardMetadata::new(&config.metadata);
        let mut registry =
            DeviceTreeRegistry::with_options(config.register_options()?).with_reader(reader);
        let mut seen = HashSet::new();

        let entries = board.kernel_devicetree();
        let mut keys = Vec::with_capacity(entries.len());
        for entry in &entries {
            let name = blob_name(entry);
            let key = name.strip_suffix(DTB_EXT).unwrap_or(name);
            keys.push(key);
            let compatible = board.dtb_compatible(key);
            let node = registry.register_blob(
                name,
                config.dtb_dir.join(name),
                &config.metadata_dtb,
                compatible.as_deref(),
            )?;
            seen.insert(node.id.clone());
        }

        if config.mode == AssemblyMode::MetadataDriven {
            for key in keys {
                for group in board.overlay_groups(key) {
                    for id in group.overlays() {
                        if !seen.insert(id.clone()) {
                            continue;
                        }
                        let file = id.strip_prefix(FDT_PREFIX).unwrap_or(id);
                        registry.register(
                            id.clone(),
                            config.dtb_dir.join(file),
                            NodeKind::Overlay,
                            None,
                        )?;
                    }
                }
            }
        }

        Ok(registry)
    }

    pub fn assemble(&self, registry: &DeviceTreeRegistry) -> Result<Configurations> {
        Assembler::new(self.config.assembly_mode(), &self.ctx)
            .start_index(self.config.start_index)
            .assemble(
                registry,
                &self.config.metadata,
                self.config.default_dtb_image.as_deref(),
            )
    }

    pub fn descriptor_from(&self, registry: DeviceTreeRegistry) -> Result<FitDescriptor> {
        let configurations = self.assemble(&registry)?;
        Ok(FitDescriptor::new(
            &self.config.description,
            &self.ctx,
            registry.into_nodes(),
            configurations,
        ))
    }

    pub fn descriptor(&self) -> Result<FitDescriptor> {
        self.descriptor_from(self.registry()?)
    }

    pub fn mkimage(&self) -> Result<Mkimage> {
        Mkimage::from_context(&self.ctx, self.config.mkimage.extra_opts.as_deref())
    }

    pub fn package(
        &self,
        descriptor: &FitDescriptor,
        packager: &dyn ImagePackager,
        its_path: &Path,
        fit_path: &Path,
    ) -> Result<()> {
        packager.package(descriptor, its_path, fit_path)
    }
}
