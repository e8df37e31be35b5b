//! Image tree source (`.its`) writer.
//!
//! Produces the device-tree source text that `mkimage -f` compiles into the
//! final FIT binary.

use crate::fit::{
    node::{DeviceTreeNode, DeviceTreeRef},
    types::{ConfigurationEntry, FitDescriptor},
};

/// Serialize a descriptor to ITS text
pub fn write_its(descriptor: &FitDescriptor) -> String {
    let mut writer = ItsWriter::new();
    writer.write_descriptor(descriptor);
    writer.finish()
}

pub struct ItsWriter {
    buffer: String,
    depth: usize,
}

impl ItsWriter {
    pub fn new() -> Self {
        Self {
            buffer: String::from("/dts-v1/;\n\n"),
            depth: 0,
        }
    }

    pub fn write_descriptor(&mut self, descriptor: &FitDescriptor) {
        self.write_node_start("/");
        self.write_property_string("description", &descriptor.description);
        self.write_property_cells("#address-cells", &format!("{}", descriptor.address_cells));
        self.blank_line();

        self.write_node_start("images");
        for (i, image) in descriptor.images.iter().enumerate() {
            if i > 0 {
                self.blank_line();
            }
            self.write_image(image, &descriptor.arch);
        }
        self.write_node_end(); // images
        self.blank_line();

        self.write_node_start("configurations");
        self.write_property_string("default", &descriptor.configurations.default);
        for config in &descriptor.configurations {
            self.blank_line();
            self.write_configuration(config);
        }
        self.write_node_end(); // configurations

        self.write_node_end(); // root
    }

    fn write_image(&mut self, image: &DeviceTreeNode, arch: &str) {
        self.write_node_start(&image.id);
        self.write_property_string("description", image.description());
        self.write_property_raw(
            "data",
            &format!("/incbin/({})", quote(&image.source_path.to_string_lossy())),
        );
        self.write_property_string("type", image.kind.its_type());
        self.write_property_string("arch", arch);
        self.write_property_string("compression", "none");
        if let Some(load) = image.load_address {
            self.write_property_cells("load", &format!("0x{load:08x}"));
        }
        if !image.compatible.is_empty() {
            self.write_property_strings("compatible", &image.compatible);
        }
        self.write_node_end();
    }

    fn write_configuration(&mut self, config: &ConfigurationEntry) {
        self.write_node_start(&config.name);
        self.write_property_string("description", &config.description);
        match &config.fdt {
            Some(DeviceTreeRef::Single(id)) => self.write_property_string("fdt", id),
            Some(DeviceTreeRef::Group(ids)) => self.write_property_strings("fdt", ids),
            None => {}
        }
        if !config.compatible.is_empty() {
            self.write_property_strings("compatible", &config.compatible);
        }
        self.write_node_end();
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push('\t');
        }
    }

    fn blank_line(&mut self) {
        self.buffer.push('\n');
    }

    fn write_node_start(&mut self, name: &str) {
        self.indent();
        self.buffer.push_str(name);
        self.buffer.push_str(" {\n");
        self.depth += 1;
    }

    fn write_node_end(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.buffer.push_str("};\n");
    }

    fn write_property_raw(&mut self, name: &str, value: &str) {
        self.indent();
        self.buffer.push_str(&format!("{name} = {value};\n"));
    }

    fn write_property_string(&mut self, name: &str, value: &str) {
        self.write_property_raw(name, &quote(value));
    }

    fn write_property_strings(&mut self, name: &str, values: &[String]) {
        let list: Vec<String> = values.iter().map(|v| quote(v)).collect();
        self.write_property_raw(name, &list.join(", "));
    }

    fn write_property_cells(&mut self, name: &str, cells: &str) {
        self.write_property_raw(name, &format!("<{cells}>"));
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

impl Default for ItsWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::ImageBuildContext,
        fit::{
            node::NodeKind,
            types::{ConfigurationEntry, Configurations},
        },
    };

    fn descriptor() -> FitDescriptor {
        let images = vec![
            DeviceTreeNode::new("fdt-qcom-metadata.dtb", "dtb/qcom-metadata.dtb", NodeKind::Metadata),
            DeviceTreeNode::new("fdt-boardA.dtb", "dtb/boardA.dtb", NodeKind::BaseDeviceTree)
                .with_compatible(vec!["qcom,a".into(), "qcom,soc".into()])
                .with_load_address(Some(0x8300_0000)),
            DeviceTreeNode::new("fdt-ovlX.dtbo", "dtb/ovlX.dtbo", NodeKind::Overlay),
        ];
        let mut first = ConfigurationEntry::new("conf-1")
            .with_fdt(DeviceTreeRef::single("fdt-boardA.dtb"))
            .with_compatible(vec!["qcom,a".into()]);
        first.is_default = true;
        let second = ConfigurationEntry::new("conf-2")
            .with_fdt(
                DeviceTreeRef::group(vec!["fdt-boardA.dtb".into(), "fdt-ovlX.dtbo".into()])
                    .unwrap(),
            )
            .with_compatible(vec!["compat.x".into()]);

        FitDescriptor::new(
            "DTB-only FIT image",
            &ImageBuildContext::default(),
            images,
            Configurations {
                default: "conf-1".into(),
                entries: vec![first, second],
            },
        )
    }

    #[test]
    fn test_header_and_root() {
        let its = write_its(&descriptor());
        assert!(its.starts_with("/dts-v1/;\n\n/ {\n"));
        assert!(its.contains("\tdescription = \"DTB-only FIT image\";\n"));
        assert!(its.contains("\t#address-cells = <1>;\n"));
        assert!(its.ends_with("};\n"));
    }

    #[test]
    fn test_image_nodes() {
        let its = write_its(&descriptor());
        assert!(its.contains("\t\tfdt-boardA.dtb {\n"));
        assert!(its.contains("\t\t\tdata = /incbin/(\"dtb/boardA.dtb\");\n"));
        assert!(its.contains("\t\t\ttype = \"qcom_metadata\";\n"));
        assert!(its.contains("\t\t\ttype = \"flat_dt\";\n"));
        assert!(its.contains("\t\t\tarch = \"arm64\";\n"));
        assert!(its.contains("\t\t\tload = <0x83000000>;\n"));
        assert!(its.contains("\t\t\tcompatible = \"qcom,a\", \"qcom,soc\";\n"));
    }

    #[test]
    fn test_configuration_nodes_in_order() {
        let its = write_its(&descriptor());
        assert!(its.contains("\t\tdefault = \"conf-1\";\n"));
        assert!(its.contains("\t\t\tfdt = \"fdt-boardA.dtb\", \"fdt-ovlX.dtbo\";\n"));
        assert!(its.contains("\t\t\tcompatible = \"compat.x\";\n"));

        let default = its.find("default = ").unwrap();
        let conf1 = its.find("conf-1 {").unwrap();
        let conf2 = its.find("conf-2 {").unwrap();
        assert!(default < conf1 && conf1 < conf2);
    }

    #[test]
    fn test_kernel_only_configuration() {
        let mut desc = descriptor();
        desc.configurations.entries = vec![ConfigurationEntry::new("conf-1")];
        let its = write_its(&desc);
        let conf = &its[its.find("conf-1 {").unwrap()..];
        assert!(!conf.contains("fdt ="));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
