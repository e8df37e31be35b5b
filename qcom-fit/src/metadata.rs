//! Board metadata lookup.
//!
//! Board topology is declared as build variables, some of them carrying
//! per-board flags keyed by the base DTB name without its extension:
//!
//! ```toml
//! [vars]
//! KERNEL_DEVICETREE = "qcom-metadata.dtb boardA.dtb boardB.dtb"
//!
//! [flags.OVERLAY_DTBOS]
//! boardA = "ovlX ovlY; ovlZ"
//!
//! [flags.FIT_DTB_DTBO_COMPATIBLE]
//! boardA = "compat.xy; compat.z"
//! ```
//!
//! A missing variable or flag is never an error; it reads as empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fit::node::overlay_node_id;

/// Space-separated list of DTB names, global
pub const KERNEL_DEVICETREE: &str = "KERNEL_DEVICETREE";
/// Semicolon-separated overlay groups, per base
pub const OVERLAY_DTBOS: &str = "OVERLAY_DTBOS";
/// Semicolon-separated compatible strings, positional to overlay groups
pub const FIT_DTB_DTBO_COMPATIBLE: &str = "FIT_DTB_DTBO_COMPATIBLE";
/// Compatible string of the base DTB itself
pub const FIT_DTB_COMPATIBLE: &str = "FIT_DTB_COMPATIBLE";

pub trait MetadataLookup {
    fn get_var(&self, name: &str) -> Option<String>;

    fn get_flag(&self, name: &str, flag: &str) -> Option<String>;
}

impl<T: MetadataLookup + ?Sized> MetadataLookup for &T {
    fn get_var(&self, name: &str) -> Option<String> {
        (**self).get_var(name)
    }

    fn get_flag(&self, name: &str, flag: &str) -> Option<String> {
        (**self).get_flag(name, flag)
    }
}

/// In-memory variable store, usually loaded from the `[metadata]` table of a
/// build config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataStore {
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub flags: BTreeMap<String, BTreeMap<String, String>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_flag(mut self, name: &str, flag: &str, value: &str) -> Self {
        self.flags
            .entry(name.to_string())
            .or_default()
            .insert(flag.to_string(), value.to_string());
        self
    }
}

impl MetadataLookup for MetadataStore {
    fn get_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn get_flag(&self, name: &str, flag: &str) -> Option<String> {
        self.flags.get(name)?.get(flag).cloned()
    }
}

/// One overlay group: the overlay node ids applied together on a base DTB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayGroup {
    overlays: Vec<String>,
}

impl OverlayGroup {
    /// Parse a whitespace-separated group. Returns `None` for a blank group.
    pub fn parse(group: &str) -> Option<Self> {
        let overlays: Vec<String> = group.split_whitespace().map(overlay_node_id).collect();
        if overlays.is_empty() {
            None
        } else {
            Some(Self { overlays })
        }
    }

    pub fn overlays(&self) -> &[String] {
        &self.overlays
    }

    pub fn into_overlays(self) -> Vec<String> {
        self.overlays
    }
}

/// Typed view over the metadata flags used for FIT configuration assembly
pub struct BoardMetadata<'a, M: ?Sized> {
    lookup: &'a M,
}

impl<'a, M: MetadataLookup + ?Sized> BoardMetadata<'a, M> {
    pub fn new(lookup: &'a M) -> Self {
        Self { lookup }
    }

    /// Entries of `KERNEL_DEVICETREE`, in declared order
    pub fn kernel_devicetree(&self) -> Vec<String> {
        self.lookup
            .get_var(KERNEL_DEVICETREE)
            .map(|v| v.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Overlay groups of `base`, blank groups dropped
    pub fn overlay_groups(&self, base: &str) -> Vec<OverlayGroup> {
        let value = self.lookup.get_flag(OVERLAY_DTBOS, base).unwrap_or_default();
        let groups: Vec<OverlayGroup> = value.split(';').filter_map(OverlayGroup::parse).collect();
        let declared = value.split(';').count();
        if !value.trim().is_empty() && groups.len() != declared {
            debug!(
                "{base}: skipped {} empty overlay group(s)",
                declared - groups.len()
            );
        }
        groups
    }

    /// Compatible strings for the overlay groups of `base`, blanks dropped
    pub fn dtbo_compatibles(&self, base: &str) -> Vec<String> {
        self.lookup
            .get_flag(FIT_DTB_DTBO_COMPATIBLE, base)
            .map(|v| split_list(&v))
            .unwrap_or_default()
    }

    /// Compatible string of the base DTB itself
    pub fn dtb_compatible(&self, base: &str) -> Option<String> {
        let value = self.lookup.get_flag(FIT_DTB_COMPATIBLE, base)?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MetadataStore {
        MetadataStore::new()
            .with_var(KERNEL_DEVICETREE, " qcom-metadata.dtb  boardA.dtb\tboardB.dtb ")
            .with_flag(OVERLAY_DTBOS, "boardA", "ovlX ovlY; ovlZ")
            .with_flag(FIT_DTB_DTBO_COMPATIBLE, "boardA", "compat.xy; compat.z")
            .with_flag(FIT_DTB_COMPATIBLE, "boardB", " qcom,boardB ")
    }

    #[test]
    fn test_kernel_devicetree() {
        let store = store();
        let board = BoardMetadata::new(&store);
        assert_eq!(
            board.kernel_devicetree(),
            vec!["qcom-metadata.dtb", "boardA.dtb", "boardB.dtb"]
        );
    }

    #[test]
    fn test_overlay_groups() {
        let store = store();
        let board = BoardMetadata::new(&store);
        let groups = board.overlay_groups("boardA");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].overlays(), ["fdt-ovlX.dtbo", "fdt-ovlY.dtbo"]);
        assert_eq!(groups[1].overlays(), ["fdt-ovlZ.dtbo"]);
    }

    #[test]
    fn test_blank_groups_are_dropped() {
        let store = MetadataStore::new().with_flag(OVERLAY_DTBOS, "b", " ;ovl1;  ; ovl2 ovl3;");
        let groups = BoardMetadata::new(&store).overlay_groups("b");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].overlays(), ["fdt-ovl2.dtbo", "fdt-ovl3.dtbo"]);
        assert!(OverlayGroup::parse("   ").is_none());
    }

    #[test]
    fn test_missing_flags_read_empty() {
        let store = MetadataStore::new();
        let board = BoardMetadata::new(&store);
        assert!(board.kernel_devicetree().is_empty());
        assert!(board.overlay_groups("boardA").is_empty());
        assert!(board.dtbo_compatibles("boardA").is_empty());
        assert_eq!(board.dtb_compatible("boardA"), None);
    }

    #[test]
    fn test_compatibles() {
        let store = store().with_flag(FIT_DTB_COMPATIBLE, "blank", "   ");
        let board = BoardMetadata::new(&store);
        assert_eq!(board.dtbo_compatibles("boardA"), vec!["compat.xy", "compat.z"]);
        assert_eq!(board.dtb_compatible("boardB").as_deref(), Some("qcom,boardB"));
        assert_eq!(board.dtb_compatible("blank"), None);
    }

    #[test]
    fn test_store_from_toml() {
        let store: MetadataStore = toml::from_str(
            r#"
            [vars]
            KERNEL_DEVICETREE = "boardA.dtb"

            [flags.OVERLAY_DTBOS]
            boardA = "ovl"
            "#,
        )
        .unwrap();
        assert_eq!(store.get_var(KERNEL_DEVICETREE).as_deref(), Some("boardA.dtb"));
        assert_eq!(store.get_flag(OVERLAY_DTBOS, "boardA").as_deref(), Some("ovl"));
        assert_eq!(store.get_flag(OVERLAY_DTBOS, "boardB"), None);
    }
}
