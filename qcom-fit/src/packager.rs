//! Packaging a FIT descriptor with an external image tool

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    context::ImageBuildContext,
    error::{PackagingFailure, Result},
    fit::{FitDescriptor, write_its},
    shell,
    utils::Command,
};

pub trait ImagePackager {
    /// Write `descriptor` to `its_path` and turn it into the FIT at `fit_path`.
    fn package(&self, descriptor: &FitDescriptor, its_path: &Path, fit_path: &Path) -> Result<()>;
}

/// U-Boot `mkimage`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mkimage {
    pub path: PathBuf,
    pub extra_args: Vec<String>,
    pub dtc_options: Option<String>,
}

impl Mkimage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extra_args: Vec::new(),
            dtc_options: None,
        }
    }

    /// Tool path and dtc options from `ctx`, extra arguments lexed from
    /// `extra_opts` with shell quoting rules.
    pub fn from_context(ctx: &ImageBuildContext, extra_opts: Option<&str>) -> Result<Self> {
        let mut mkimage = Self::new(&ctx.mkimage_path).with_dtc_options(ctx.dtc_options.clone());
        if let Some(opts) = extra_opts {
            mkimage = mkimage.with_extra_opts(opts)?;
        }
        Ok(mkimage)
    }

    pub fn with_extra_opts(mut self, opts: &str) -> Result<Self> {
        self.extra_args = shell::split(opts)?;
        Ok(self)
    }

    pub fn with_dtc_options(mut self, opts: Option<String>) -> Self {
        self.dtc_options = opts.filter(|o| !o.is_empty());
        self
    }

    /// Arguments after the program name:
    /// `[-D <dtc opts>] <extra args...> -f <its> <fit>`
    pub fn args(&self, its_path: &Path, fit_path: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.extra_args.len() + 5);
        if let Some(opts) = &self.dtc_options {
            args.push(OsString::from("-D"));
            args.push(OsString::from(opts));
        }
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push(OsString::from("-f"));
        args.push(its_path.as_os_str().to_os_string());
        args.push(fit_path.as_os_str().to_os_string());
        args
    }

    fn command(&self, its_path: &Path, fit_path: &Path) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args(self.args(its_path, fit_path));
        cmd
    }
}

impl ImagePackager for Mkimage {
    fn package(&self, descriptor: &FitDescriptor, its_path: &Path, fit_path: &Path) -> Result<()> {
        fs::write(its_path, write_its(descriptor))?;
        debug!("wrote {}", its_path.display());

        let mut cmd = self.command(its_path, fit_path);
        let command = cmd.cmd_line();
        info!("Running mkimage with extra opts: {command}");
        cmd.print_cmd();

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(PackagingFailure {
                command,
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                its_path: std::path::absolute(its_path).unwrap_or_else(|_| its_path.to_path_buf()),
            }
            .into());
        }

        info!("FIT image written to {}", fit_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_without_options() {
        let mkimage = Mkimage::new("mkimage");
        assert_eq!(
            strings(mkimage.args(Path::new("fit.its"), Path::new("fitImage"))),
            ["-f", "fit.its", "fitImage"]
        );
    }

    #[test]
    fn test_dtc_options_come_first() {
        let mkimage = Mkimage::new("mkimage")
            .with_dtc_options(Some("-I dts -O dtb -p 2000".to_string()))
            .with_extra_opts("-E -B 0x8 -n 'qcom fit'")
            .unwrap();
        assert_eq!(
            strings(mkimage.args(Path::new("a.its"), Path::new("a.fit"))),
            [
                "-D",
                "-I dts -O dtb -p 2000",
                "-E",
                "-B",
                "0x8",
                "-n",
                "qcom fit",
                "-f",
                "a.its",
                "a.fit"
            ]
        );
    }

    #[test]
    fn test_empty_dtc_options_omitted() {
        let mkimage = Mkimage::new("mkimage").with_dtc_options(Some(String::new()));
        assert_eq!(mkimage.dtc_options, None);
    }

    #[test]
    fn test_from_context() {
        let ctx = ImageBuildContext::default()
            .with_mkimage_path("/usr/bin/uboot-mkimage")
            .with_dtc_options(Some("-@".to_string()));
        let mkimage = Mkimage::from_context(&ctx, Some("-E")).unwrap();
        assert_eq!(mkimage.path, PathBuf::from("/usr/bin/uboot-mkimage"));
        assert_eq!(mkimage.dtc_options.as_deref(), Some("-@"));
        assert_eq!(mkimage.extra_args, ["-E"]);

        assert!(Mkimage::from_context(&ctx, Some("-n 'open")).is_err());
    }
}
