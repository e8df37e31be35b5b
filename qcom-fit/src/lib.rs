//! # qcom-fit
//!
//! Assembles the `configurations` section of a DTB-only FIT image for
//! Qualcomm boards and packages it with U-Boot's `mkimage`.
//!
//! Device-tree blobs are registered as image sections, then turned into
//! numbered configurations either one per compatible string of each blob or
//! grouped by the overlay layout declared in board metadata.
//!
//! ## Example
//!
//! ```rust
//! use qcom_fit::{
//!     Assembler, DeviceTreeRegistry, ImageBuildContext, Mode, NodeKind,
//!     metadata::{KERNEL_DEVICETREE, MetadataStore, OVERLAY_DTBOS},
//! };
//!
//! let metadata = MetadataStore::new()
//!     .with_var(KERNEL_DEVICETREE, "qcom-metadata.dtb boardA.dtb")
//!     .with_flag(OVERLAY_DTBOS, "boardA", "camera; display");
//!
//! let mut registry = DeviceTreeRegistry::new();
//! registry.register("fdt-boardA.dtb", "dtb/boardA.dtb", NodeKind::BaseDeviceTree, Some("qcom,boardA"))?;
//!
//! let ctx = ImageBuildContext::default();
//! let mode = Mode::MetadataDrivenGrouping {
//!     metadata_dtb: "qcom-metadata.dtb".to_string(),
//! };
//! let configs = Assembler::new(mode, &ctx).assemble(&registry, &metadata, None)?;
//!
//! assert_eq!(configs.len(), 3);
//! assert_eq!(configs.default, "conf-1");
//! # Ok::<(), qcom_fit::FitError>(())
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod context;
pub mod dtc;
pub mod error;
pub mod fit;
pub mod metadata;
pub mod packager;
pub mod shell;
mod utils;

#[macro_use]
extern crate log;

pub use build::FitBuild;
pub use config::{AssemblyMode, FitBuildConfig};
pub use context::ImageBuildContext;
pub use error::{FitError, PackagingFailure, Result};
pub use fit::{
    Assembler, ConfigurationEntry, Configurations, DeviceTreeNode, DeviceTreeRef,
    DeviceTreeRegistry, FitDescriptor, Mode, NodeKind, RegisterOptions, write_its,
};
pub use packager::{ImagePackager, Mkimage};

/// Current version of qcom-fit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
