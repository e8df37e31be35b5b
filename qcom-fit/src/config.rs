//! Build configuration file.
//!
//! ```toml
//! description = "RB3 Gen2 DTB image"
//! mode = "metadata-driven"
//! dtb_dir = "deploy/dtb"
//! dtb_load_address = "0x83000000"
//!
//! [mkimage]
//! extra_opts = "-E -B 0x8"
//!
//! [metadata.vars]
//! KERNEL_DEVICETREE = "qcom-metadata.dtb qcs6490-rb3gen2.dtb"
//!
//! [metadata.flags.OVERLAY_DTBOS]
//! qcs6490-rb3gen2 = "camera; display"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    context::ImageBuildContext,
    error::{FitError, Result},
    fit::{DEFAULT_START_INDEX, Mode, RegisterOptions},
    metadata::MetadataStore,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FitBuildConfig {
    pub description: String,
    pub conf_prefix: String,
    pub arch: String,
    pub mode: AssemblyMode,
    /// Metadata-only DTB, never bootable
    pub metadata_dtb: String,
    pub start_index: u32,
    /// Selects `<conf_prefix><default_dtb_image>` as the default configuration
    pub default_dtb_image: Option<String>,
    /// Directory holding the compiled blobs
    pub dtb_dir: PathBuf,
    pub dtb_load_address: Option<String>,
    pub dtbo_load_address: Option<String>,
    /// Read compatible strings from base blobs with `fdtget`
    pub add_compatible: bool,
    pub fdtget: PathBuf,
    pub mkimage: MkimageConfig,
    pub metadata: MetadataStore,
}

impl Default for FitBuildConfig {
    fn default() -> Self {
        Self {
            description: "Flattened Image Tree with device tree blobs".to_string(),
            conf_prefix: "conf-".to_string(),
            arch: "arm64".to_string(),
            mode: AssemblyMode::default(),
            metadata_dtb: "qcom-metadata.dtb".to_string(),
            start_index: DEFAULT_START_INDEX,
            default_dtb_image: None,
            dtb_dir: PathBuf::from("."),
            dtb_load_address: None,
            dtbo_load_address: None,
            add_compatible: false,
            fdtget: PathBuf::from("fdtget"),
            mkimage: MkimageConfig::default(),
            metadata: MetadataStore::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AssemblyMode {
    PerBlobFanout,
    #[default]
    MetadataDriven,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MkimageConfig {
    pub path: PathBuf,
    /// Extra arguments, split with shell quoting rules
    pub extra_opts: Option<String>,
    /// Passed through as `-D <dtc_options>`
    pub dtc_options: Option<String>,
}

impl Default for MkimageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mkimage"),
            extra_opts: None,
            dtc_options: None,
        }
    }
}

impl FitBuildConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a config file. A relative `dtb_dir` is taken relative to the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if config.dtb_dir.is_relative() {
            if let Some(base) = path.parent() {
                config.dtb_dir = base.join(&config.dtb_dir);
            }
        }
        debug!("loaded build config {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn context(&self) -> ImageBuildContext {
        ImageBuildContext::new(&self.conf_prefix)
            .with_arch(&self.arch)
            .with_mkimage_path(&self.mkimage.path)
            .with_dtc_options(self.mkimage.dtc_options.clone())
    }

    pub fn assembly_mode(&self) -> Mode {
        match self.mode {
            AssemblyMode::PerBlobFanout => Mode::PerBlobFanout,
            AssemblyMode::MetadataDriven => Mode::MetadataDrivenGrouping {
                metadata_dtb: self.metadata_dtb.clone(),
            },
        }
    }

    pub fn register_options(&self) -> Result<RegisterOptions> {
        Ok(RegisterOptions {
            add_compatible: self.add_compatible,
            dtb_load_address: self.dtb_load_address.as_deref().map(parse_address).transpose()?,
            dtbo_load_address: self.dtbo_load_address.as_deref().map(parse_address).transpose()?,
        })
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal address
pub fn parse_address(s: &str) -> Result<u64> {
    let trimmed = s.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|source| FitError::InvalidAddress {
        value: s.to_string(),
        source,
    })
}
