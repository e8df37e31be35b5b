//! Main entry point for the qcom-fit CLI tool

use clap::Parser;
use colored::Colorize;
use qcom_fit::cli::{Args, run_cli};

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    if let Err(e) = run_cli(args) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
