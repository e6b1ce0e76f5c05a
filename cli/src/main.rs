use std::{error::Error, path::PathBuf};

use clap::Parser;
use dfdmap_cli::{
    config::Config,
    run::{StageStatus, run},
};
use simple_error::bail;

#[derive(Debug, Parser)]
#[command(
    name = "dfdmap",
    about = "Extract debug blocks and reconcile them with the mapping table."
)]
struct Args {
    /// TOML configuration; built-in defaults when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, default_value = "input")]
    input_dir: PathBuf,
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let summary = run(&config, &args.input_dir, &args.output_dir);

    println!("STAGES:");
    for (stage, status) in &summary.stages {
        match status {
            StageStatus::Done(msg) => println!("\t{stage:9}: ok, {msg}"),
            StageStatus::Skipped(why) => println!("\t{stage:9}: skipped, {why}"),
            StageStatus::Failed(fail) => {
                println!("\t{stage:9}: FAILED [{k:?}] {m}", k = fail.kind, m = fail.message)
            }
        }
    }
    if !summary.warnings.is_empty() {
        println!("WARNINGS:");
        for warning in &summary.warnings {
            println!("\t{warning}");
        }
    }
    if summary.blocks_failed() {
        bail!("block extraction failed, no outputs written");
    }
    Ok(())
}
