use std::path::PathBuf;

/// Image-wide settings read by configuration assembly and packaging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuildContext {
    /// Prefix of configuration node names, e.g. `conf-`
    pub conf_prefix: String,
    pub arch: String,
    pub mkimage_path: PathBuf,
    /// Passed to mkimage as `-D <opts>` when set
    pub dtc_options: Option<String>,
}

impl Default for ImageBuildContext {
    fn default() -> Self {
        Self {
            conf_prefix: "conf-".to_string(),
            arch: "arm64".to_string(),
            mkimage_path: PathBuf::from("mkimage"),
            dtc_options: None,
        }
    }
}

impl ImageBuildContext {
    pub fn new(conf_prefix: impl Into<String>) -> Self {
        Self {
            conf_prefix: conf_prefix.into(),
            ..Default::default()
        }
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    pub fn with_mkimage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mkimage_path = path.into();
        self
    }

    pub fn with_dtc_options(mut self, opts: Option<String>) -> Self {
        self.dtc_options = opts.filter(|o| !o.trim().is_empty());
        self
    }

    /// Name of the configuration with the given index or selector
    pub fn conf_name(&self, suffix: impl std::fmt::Display) -> String {
        format!("{}{}", self.conf_prefix, suffix)
    }
}
