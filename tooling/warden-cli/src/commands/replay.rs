use clap::Args;
use colored::*;
use std::fs;
use std::path::PathBuf;
use warden_core::{wrapped_token_runner, FailureReport};

use super::load_config;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Failure report written by `warden run --save-failures`
    pub report: PathBuf,

    /// Configuration the report was produced with
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn exec(args: ReplayArgs) -> anyhow::Result<()> {
    let content = fs::read_to_string(&args.report)?;
    let report: FailureReport = serde_json::from_str(&content)?;

    let mut config = load_config(args.config.as_deref())?;
    if !config.invariants.contains(&report.predicate) {
        config.invariants.push(report.predicate.clone());
    }
    let runner = wrapped_token_runner(&config)?;
    let replay = runner.replay(&report.records(), Some(&report.predicate))?;

    for (i, call) in replay.executed.iter().enumerate() {
        println!("   [{}] {}", i, call);
    }

    if replay.reproduces_report(&report) {
        println!(
            "{} Reproduced: {} breaks after {} call(s)",
            "❌".red(),
            report.predicate.bold(),
            replay.executed.len()
        );
        std::process::exit(1);
    }

    println!(
        "{} {} holds for the whole sequence",
        "✅".green(),
        report.predicate
    );
    Ok(())
}
