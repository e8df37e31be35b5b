//! FIT descriptor data types

use serde::Serialize;

use crate::{
    context::ImageBuildContext,
    fit::node::{DeviceTreeNode, DeviceTreeRef},
};

/// One bootable configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationEntry {
    pub name: String,

    pub description: String,

    /// Blobs to load, base first. `None` only for a kernel-only configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fdt: Option<DeviceTreeRef>,

    /// Board identities this configuration matches
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compatible: Vec<String>,

    pub is_default: bool,
}

impl ConfigurationEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "Kernel only".to_string(),
            fdt: None,
            compatible: Vec::new(),
            is_default: false,
        }
    }

    pub fn with_fdt(mut self, fdt: DeviceTreeRef) -> Self {
        self.description = "FDT Blob".to_string();
        self.fdt = Some(fdt);
        self
    }

    pub fn with_compatible(mut self, compatible: Vec<String>) -> Self {
        self.compatible = compatible;
        self
    }
}

/// The `configurations` node: ordered entries plus the default's name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Configurations {
    pub default: String,
    pub entries: Vec<ConfigurationEntry>,
}

impl Configurations {
    pub fn get(&self, name: &str) -> Option<&ConfigurationEntry> {
        self.entries.iter().find(|c| c.name == name)
    }

    pub fn default_entry(&self) -> Option<&ConfigurationEntry> {
        self.get(&self.default)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigurationEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Configurations {
    type Item = &'a ConfigurationEntry;
    type IntoIter = std::slice::Iter<'a, ConfigurationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Abstract image tree handed to the packager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FitDescriptor {
    pub description: String,
    pub address_cells: u32,
    pub arch: String,
    pub images: Vec<DeviceTreeNode>,
    pub configurations: Configurations,
}

impl FitDescriptor {
    pub fn new(
        description: impl Into<String>,
        ctx: &ImageBuildContext,
        images: Vec<DeviceTreeNode>,
        configurations: Configurations,
    ) -> Self {
        Self {
            description: description.into(),
            address_cells: 1,
            arch: ctx.arch.clone(),
            images,
            configurations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_entry_creation() {
        let entry = ConfigurationEntry::new("conf-2")
            .with_fdt(DeviceTreeRef::single("fdt-a.dtb"))
            .with_compatible(vec!["qcom,a".to_string()]);

        assert_eq!(entry.name, "conf-2");
        assert_eq!(entry.description, "FDT Blob");
        assert_eq!(entry.fdt, Some(DeviceTreeRef::single("fdt-a.dtb")));
        assert_eq!(entry.compatible, ["qcom,a"]);
        assert!(!entry.is_default);
    }

    #[test]
    fn test_default_entry_lookup() {
        let mut second = ConfigurationEntry::new("conf-2");
        second.is_default = true;
        let configs = Configurations {
            default: "conf-2".to_string(),
            entries: vec![ConfigurationEntry::new("conf-1"), second],
        };

        assert_eq!(configs.len(), 2);
        assert_eq!(configs.default_entry().map(|c| c.name.as_str()), Some("conf-2"));
        assert!(configs.get("conf-3").is_none());
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = ConfigurationEntry::new("conf-1").with_fdt(
            DeviceTreeRef::group(vec!["fdt-a.dtb".into(), "fdt-x.dtbo".into()]).unwrap(),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["fdt"], serde_json::json!(["fdt-a.dtb", "fdt-x.dtbo"]));
        assert!(json.get("compatible").is_none());
    }
}
