//! Reading compatible strings out of compiled device-tree blobs

use std::path::{Path, PathBuf};

use crate::utils::Command;

/// Source of a blob's root `compatible` property.
///
/// `None` means the strings could not be read; callers treat that the same as
/// a blob without compatible strings.
pub trait CompatibleReader {
    fn read_compatible(&self, blob: &Path) -> Option<Vec<String>>;
}

impl<F> CompatibleReader for F
where
    F: Fn(&Path) -> Option<Vec<String>>,
{
    fn read_compatible(&self, blob: &Path) -> Option<Vec<String>> {
        self(blob)
    }
}

/// Runs `fdtget -t s <blob> / compatible`
#[derive(Debug, Clone)]
pub struct Fdtget {
    program: PathBuf,
}

impl Fdtget {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Fdtget {
    fn default() -> Self {
        Self::new("fdtget")
    }
}

impl CompatibleReader for Fdtget {
    fn read_compatible(&self, blob: &Path) -> Option<Vec<String>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-t", "s"]).arg(blob).args(["/", "compatible"]);

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) => {
                debug!("{}: {e}", cmd.cmd_line());
                return None;
            }
        };
        if !output.status.success() {
            debug!(
                "{} failed with {}: {}",
                cmd.cmd_line(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        Some(parse_compatible(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// `fdtget -t s` prints a string list separated by spaces
pub fn parse_compatible(stdout: &str) -> Vec<String> {
    stdout.split_whitespace().map(String::from).collect()
}
