//! Ordered registry of the device-tree sections emitted into an image

use std::path::{Path, PathBuf};

use crate::{
    dtc::CompatibleReader,
    error::{FitError, Result},
    fit::node::{DeviceTreeNode, NodeKind, base_node_id},
};

/// Options applied to every registered blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Read compatible strings from base blobs that have no explicit override
    pub add_compatible: bool,
    pub dtb_load_address: Option<u64>,
    pub dtbo_load_address: Option<u64>,
}

/// Append-only list of device-tree nodes for one image build.
///
/// Registration order is the order configurations are derived in. Ids are not
/// required to be unique; registering the same id twice yields two nodes.
#[derive(Default)]
pub struct DeviceTreeRegistry {
    nodes: Vec<DeviceTreeNode>,
    metadata_index: Option<usize>,
    options: RegisterOptions,
    reader: Option<Box<dyn CompatibleReader>>,
}

impl DeviceTreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RegisterOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn with_reader(mut self, reader: impl CompatibleReader + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    pub fn options(&self) -> &RegisterOptions {
        &self.options
    }

    /// Append a node.
    ///
    /// `compatible_override` is split on whitespace and used as is. Without
    /// it, base device trees get their compatible strings from the reader when
    /// `add_compatible` is set; overlays and metadata blobs never do.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        source_path: impl Into<PathBuf>,
        kind: NodeKind,
        compatible_override: Option<&str>,
    ) -> Result<&DeviceTreeNode> {
        let id = id.into();
        if id.is_empty() {
            return Err(FitError::invalid_argument("device tree id must not be empty"));
        }
        let source_path = source_path.into();

        let compatible = match compatible_override {
            Some(s) => s.split_whitespace().map(String::from).collect(),
            None if kind == NodeKind::BaseDeviceTree && self.options.add_compatible => {
                self.read_compatible(&source_path)
            }
            None => Vec::new(),
        };

        let load_address = match kind {
            NodeKind::Overlay => self.options.dtbo_load_address,
            NodeKind::BaseDeviceTree | NodeKind::Metadata => self.options.dtb_load_address,
        };

        if kind == NodeKind::Metadata && self.metadata_index.is_none() {
            self.metadata_index = Some(self.nodes.len());
        }

        debug!("register {id} ({kind:?}) from {}", source_path.display());
        self.nodes.push(
            DeviceTreeNode::new(id, source_path, kind)
                .with_compatible(compatible)
                .with_load_address(load_address),
        );
        Ok(&self.nodes[self.nodes.len() - 1])
    }

    /// Register a blob by file name, deriving its id and kind.
    pub fn register_blob(
        &mut self,
        blob_name: &str,
        source_path: impl Into<PathBuf>,
        metadata_dtb: &str,
        compatible_override: Option<&str>,
    ) -> Result<&DeviceTreeNode> {
        let kind = NodeKind::classify(blob_name, metadata_dtb);
        self.register(base_node_id(blob_name), source_path, kind, compatible_override)
    }

    fn read_compatible(&self, blob: &Path) -> Vec<String> {
        let Some(reader) = &self.reader else {
            return Vec::new();
        };
        match reader.read_compatible(blob) {
            Some(compatible) => compatible,
            None => {
                warn!("could not read compatible strings from {}", blob.display());
                Vec::new()
            }
        }
    }

    pub fn nodes(&self) -> &[DeviceTreeNode] {
        &self.nodes
    }

    /// Nodes that may back a configuration, in registration order
    pub fn bootable(&self) -> impl Iterator<Item = &DeviceTreeNode> {
        self.nodes.iter().filter(|n| n.kind.is_bootable())
    }

    /// The first metadata blob registered, if any
    pub fn metadata_node(&self) -> Option<&DeviceTreeNode> {
        self.metadata_index.map(|i| &self.nodes[i])
    }

    /// First node registered under `id`
    pub fn get(&self, id: &str) -> Option<&DeviceTreeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn into_nodes(self) -> Vec<DeviceTreeNode> {
        self.nodes
    }
}
