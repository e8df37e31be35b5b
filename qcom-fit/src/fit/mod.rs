//! FIT descriptor model and configuration assembly

pub mod assembler;
pub mod its;
pub mod node;
pub mod registry;
pub mod types;

pub use assembler::{Assembler, DEFAULT_START_INDEX, Mode};
pub use its::write_its;
pub use node::{DeviceTreeNode, DeviceTreeRef, NodeKind};
pub use registry::{DeviceTreeRegistry, RegisterOptions};
pub use types::{ConfigurationEntry, Configurations, FitDescriptor};
