//! Packaging against stand-in mkimage scripts
#![cfg(unix)]

use std::{fs, path::Path};

use qcom_fit::{
    Assembler, DeviceTreeRegistry, FitDescriptor, FitError, ImageBuildContext, ImagePackager,
    Mkimage, Mode, metadata::MetadataStore,
};
use tempfile::TempDir;

/// Runs `sh <script>` so the stand-in needs no exec bit
fn stand_in(dir: &TempDir, body: &str) -> Mkimage {
    let script = dir.path().join("mkimage.sh");
    fs::write(&script, body).unwrap();
    Mkimage::new("/bin/sh")
        .with_extra_opts(&format!("'{}'", script.display()))
        .unwrap()
}

fn descriptor() -> FitDescriptor {
    let mut registry = DeviceTreeRegistry::new();
    registry
        .register_blob("boardA.dtb", "dtb/boardA.dtb", "qcom-metadata.dtb", Some("qcom,a"))
        .unwrap();
    let ctx = ImageBuildContext::default();
    let configs = Assembler::new(Mode::PerBlobFanout, &ctx)
        .assemble(&registry, &MetadataStore::new(), None)
        .unwrap();
    FitDescriptor::new("test image", &ctx, registry.into_nodes(), configs)
}

#[test]
fn test_successful_packaging() {
    let dir = TempDir::new().unwrap();
    // $1 = -f, $2 = its, $3 = fit
    let mkimage = stand_in(&dir, "[ \"$1\" = -f ] || exit 9\ncat \"$2\" > \"$3\"\n");
    let its = dir.path().join("fitImage.its");
    let fit = dir.path().join("fitImage");

    mkimage.package(&descriptor(), &its, &fit).unwrap();

    let written = fs::read_to_string(&its).unwrap();
    assert!(written.starts_with("/dts-v1/;"));
    assert_eq!(fs::read_to_string(&fit).unwrap(), written);
}

#[test]
fn test_failure_carries_diagnostics() {
    let dir = TempDir::new().unwrap();
    let mkimage = stand_in(&dir, "echo 'parsing its'\necho 'syntax error' >&2\nexit 3\n");
    let its = dir.path().join("bad.its");
    let fit = dir.path().join("bad.fit");

    let err = mkimage.package(&descriptor(), &its, &fit).unwrap_err();
    let failure = match err {
        FitError::Packaging(failure) => failure,
        other => panic!("expected a packaging failure, got {other:?}"),
    };

    assert_eq!(failure.exit_code, Some(3));
    assert_eq!(failure.stdout.trim(), "parsing its");
    assert_eq!(failure.stderr.trim(), "syntax error");
    assert!(failure.command.starts_with("/bin/sh "));
    assert!(failure.command.ends_with(&format!("-f {} {}", its.display(), fit.display())));
    assert!(failure.its_path.is_absolute());
    assert_eq!(failure.its_path, its);
    assert!(its.exists());
    assert!(!fit.exists());

    let message = failure.to_string();
    assert!(message.contains("failed with return code 3"));
    assert!(message.contains("stderr: syntax error"));
    assert!(message.contains(&format!("itsfile: {}", its.display())));
}

#[test]
fn test_missing_tool_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mkimage = Mkimage::new("/nonexistent/mkimage");
    let err = mkimage
        .package(
            &descriptor(),
            &dir.path().join("a.its"),
            Path::new("/nonexistent/a.fit"),
        )
        .unwrap_err();
    assert!(matches!(err, FitError::Io(_)));
}
