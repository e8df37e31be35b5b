//! Command line interface for qcom-fit

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::LevelFilter;

use crate::{FitBuild, FitBuildConfig, FitDescriptor, VERSION, fit::write_its};

/// Command line arguments for qcom-fit
#[derive(Parser, Debug)]
#[command(name = "qcom-fit")]
#[command(version = VERSION)]
#[command(about = "Assemble and package DTB-only FIT images for Qualcomm boards", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - only output errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the configurations a build config assembles to
    List(ListArgs),
    /// Write the image tree source without packaging it
    Its(ItsArgs),
    /// Write the image tree source and package it with mkimage
    Build(BuildArgs),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Build config file
    #[arg(short, long, default_value = "fit.toml")]
    pub config: PathBuf,

    /// Print in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ItsArgs {
    /// Build config file
    #[arg(short, long, default_value = "fit.toml")]
    pub config: PathBuf,

    /// Output ITS file
    #[arg(short, long, default_value = "fitImage.its")]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Build config file
    #[arg(short, long, default_value = "fit.toml")]
    pub config: PathBuf,

    /// Output FIT image file
    #[arg(short, long, default_value = "fitImage")]
    pub output: PathBuf,

    /// ITS file handed to mkimage (default: output with an `.its` extension)
    #[arg(long)]
    pub its: Option<PathBuf>,
}

/// Main CLI handler
pub fn run_cli(args: Args) -> anyhow::Result<()> {
    match args.command {
        Commands::List(list_args) => handle_list(list_args),
        Commands::Its(its_args) => handle_its(its_args),
        Commands::Build(build_args) => handle_build(build_args),
    }
}

fn load(config: &Path) -> anyhow::Result<FitBuild> {
    let config = FitBuildConfig::load(config)
        .with_context(|| format!("failed to load build config {}", config.display()))?;
    Ok(FitBuild::new(config))
}

fn handle_list(args: ListArgs) -> anyhow::Result<()> {
    let build = load(&args.config)?;
    let descriptor = build.descriptor().context("failed to assemble configurations")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
    } else {
        print_descriptor(&descriptor);
    }
    Ok(())
}

fn handle_its(args: ItsArgs) -> anyhow::Result<()> {
    let build = load(&args.config)?;
    let descriptor = build.descriptor().context("failed to assemble configurations")?;

    fs::write(&args.output, write_its(&descriptor))
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("ITS written to {}", args.output.display());
    Ok(())
}

fn handle_build(args: BuildArgs) -> anyhow::Result<()> {
    let build = load(&args.config)?;
    let descriptor = build.descriptor().context("failed to assemble configurations")?;
    let mkimage = build.mkimage()?;
    let its = args
        .its
        .unwrap_or_else(|| args.output.with_extension("its"));

    build
        .package(&descriptor, &mkimage, &its, &args.output)
        .context("failed to package FIT image")?;
    Ok(())
}

fn print_descriptor(descriptor: &FitDescriptor) {
    println!("{}", descriptor.description.bold());
    println!();
    println!("{}", "Images:".green().bold());
    for image in &descriptor.images {
        println!(
            "  {:<32} {:<14} {}",
            image.id,
            image.kind.its_type(),
            image.compatible.join(" ")
        );
    }

    println!();
    println!("{}", "Configurations:".green().bold());
    for config in &descriptor.configurations {
        let fdt = config
            .fdt
            .as_ref()
            .map(|f| f.ids().join(", "))
            .unwrap_or_else(|| "-".to_string());
        let marker = if config.is_default { "*" } else { " " };
        let line = format!(
            "{marker} {:<10} {:<48} {}",
            config.name,
            fdt,
            config.compatible.join(" ")
        );
        if config.is_default {
            println!("{}", line.yellow());
        } else {
            println!("{line}");
        }
    }
}
