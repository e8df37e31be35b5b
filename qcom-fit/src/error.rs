//! Error types for FIT descriptor assembly and packaging

use std::{fmt, path::PathBuf};

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, FitError>;

#[derive(thiserror::Error, Debug)]
pub enum FitError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("default configuration '{name}' does not match any emitted configuration")]
    UnknownDefault { name: String },

    #[error("cannot split option string: {0}")]
    Lex(String),

    #[error("invalid address '{value}': {source}")]
    InvalidAddress {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Packaging(#[from] PackagingFailure),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FitError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unknown_default(name: impl Into<String>) -> Self {
        Self::UnknownDefault { name: name.into() }
    }

    pub fn lex(msg: impl Into<String>) -> Self {
        Self::Lex(msg.into())
    }
}

/// External image tool exited unsuccessfully.
///
/// Carries everything needed for a postmortem: the full command line, the
/// exit code (`None` when killed by a signal), captured output and the
/// absolute path of the ITS file that was fed to the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingFailure {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub its_path: PathBuf,
}

impl fmt::Display for PackagingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command '{}' failed with return code ", self.command)?;
        match self.exit_code {
            Some(code) => writeln!(f, "{code}")?,
            None => writeln!(f, "<signal>")?,
        }
        writeln!(f, "stdout: {}", self.stdout)?;
        writeln!(f, "stderr: {}", self.stderr)?;
        write!(f, "itsfile: {}", self.its_path.display())
    }
}

impl std::error::Error for PackagingFailure {}
