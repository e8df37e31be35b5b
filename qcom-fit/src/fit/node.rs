//! Device-tree image nodes and references to them

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{FitError, Result};

/// Prefix of every device-tree image node name
pub const FDT_PREFIX: &str = "fdt-";
pub const DTB_EXT: &str = ".dtb";
pub const DTBO_EXT: &str = ".dtbo";

/// What a registered blob is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Bootable base device tree
    BaseDeviceTree,
    /// Overlay applied on top of a base device tree
    Overlay,
    /// Board metadata carrier, never bootable
    Metadata,
}

impl NodeKind {
    /// Classify a blob by its file name.
    pub fn classify(blob_name: &str, metadata_dtb: &str) -> Self {
        if blob_name.ends_with(DTBO_EXT) {
            Self::Overlay
        } else if blob_name == metadata_dtb {
            Self::Metadata
        } else {
            Self::BaseDeviceTree
        }
    }

    /// Value of the `type` property in the image node
    pub fn its_type(&self) -> &'static str {
        match self {
            Self::Metadata => "qcom_metadata",
            Self::BaseDeviceTree | Self::Overlay => "flat_dt",
        }
    }

    pub fn is_bootable(&self) -> bool {
        !matches!(self, Self::Metadata)
    }
}

/// One device-tree blob or overlay section of the image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceTreeNode {
    pub id: String,
    pub source_path: PathBuf,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compatible: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_address: Option<u64>,
}

impl DeviceTreeNode {
    pub fn new(id: impl Into<String>, source_path: impl Into<PathBuf>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            source_path: source_path.into(),
            kind,
            compatible: Vec::new(),
            load_address: None,
        }
    }

    pub fn with_compatible(mut self, compatible: Vec<String>) -> Self {
        self.compatible = compatible;
        self
    }

    pub fn with_load_address(mut self, load_address: Option<u64>) -> Self {
        self.load_address = load_address;
        self
    }

    pub fn description(&self) -> &'static str {
        "Flattened Device Tree blob"
    }
}

/// Node id of a base blob, `boardA.dtb` -> `fdt-boardA.dtb`
pub fn base_node_id(blob_name: &str) -> String {
    format!("{FDT_PREFIX}{blob_name}")
}

/// Normalize an overlay token from metadata to its node id.
///
/// `ovl` -> `fdt-ovl.dtbo`; already-qualified tokens are kept.
pub fn overlay_node_id(token: &str) -> String {
    let mut id = if token.starts_with(FDT_PREFIX) {
        token.to_string()
    } else {
        format!("{FDT_PREFIX}{token}")
    };
    if !id.ends_with(DTBO_EXT) {
        id.push_str(DTBO_EXT);
    }
    id
}

/// File name part of a `KERNEL_DEVICETREE` entry such as `qcom/boardA.dtb`
pub fn blob_name(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}

/// The `fdt` property of a configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DeviceTreeRef {
    Single(String),
    /// Base blob first, then its overlays in apply order
    Group(Vec<String>),
}

impl DeviceTreeRef {
    pub fn single(id: impl Into<String>) -> Self {
        Self::Single(id.into())
    }

    pub fn group(ids: Vec<String>) -> Result<Self> {
        if ids.is_empty() {
            return Err(FitError::invalid_argument(
                "device tree group must reference at least one blob",
            ));
        }
        Ok(Self::Group(ids))
    }

    pub fn ids(&self) -> &[String] {
        match self {
            Self::Single(id) => std::slice::from_ref(id),
            Self::Group(ids) => ids,
        }
    }

    /// The base blob of this reference
    pub fn primary(&self) -> Option<&str> {
        self.ids().first().map(String::as_str)
    }
}
