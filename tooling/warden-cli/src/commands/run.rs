use clap::Args;
use colored::*;
use std::fs;
use std::path::PathBuf;
use warden_core::{wrapped_token_runner, FailureReport, FuzzSummary, TracingSink, WardenConfig};

use super::load_config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file (defaults to ./.warden.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of independent sequences
    #[arg(long)]
    pub runs: Option<usize>,

    /// Calls per sequence
    #[arg(long)]
    pub depth: Option<usize>,

    /// Campaign seed; random when absent
    #[arg(long)]
    pub seed: Option<u64>,

    /// Report failing sequences without shrinking them
    #[arg(long)]
    pub no_shrink: bool,

    /// Only fuzz actions whose name matches this regex (repeatable)
    #[arg(long = "target-action")]
    pub target_actions: Vec<String>,

    /// Check this built-in invariant instead of the configured ones (repeatable)
    #[arg(long = "invariant")]
    pub invariants: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Write every failure report as JSON into this directory
    #[arg(long)]
    pub save_failures: Option<PathBuf>,
}

impl RunArgs {
    /// Command-line flags override the file configuration.
    fn apply(&self, config: &mut WardenConfig) {
        if let Some(runs) = self.runs {
            config.fuzz.runs = runs;
        }
        if let Some(depth) = self.depth {
            config.fuzz.depth = depth;
        }
        if self.seed.is_some() {
            config.fuzz.seed = self.seed;
        }
        if self.no_shrink {
            config.fuzz.shrink = false;
        }
        if !self.target_actions.is_empty() {
            config.fuzz.target_actions = self.target_actions.clone();
        }
        if !self.invariants.is_empty() {
            config.invariants = self.invariants.clone();
        }
    }
}

pub fn exec(args: RunArgs) -> anyhow::Result<()> {
    let is_json = args.format == "json";
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    let runner = match wrapped_token_runner(&config) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("{} Invalid campaign configuration: {}", "✗".red(), e);
            std::process::exit(2);
        }
    };

    if !is_json {
        println!(
            "{} Fuzzing {} action(s) against {} invariant(s)...",
            "🔍".blue(),
            runner.actions().len(),
            runner.invariants().len()
        );
    }

    let summary = runner.run(&mut TracingSink)?;

    if let Some(dir) = &args.save_failures {
        save_failures(dir, &summary.failures)?;
    }

    if is_json {
        println!("{}", summary.to_json()?);
    } else {
        print_summary(&summary);
    }

    if !summary.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn save_failures(dir: &std::path::Path, failures: &[FailureReport]) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    for (i, report) in failures.iter().enumerate() {
        let path = dir.join(format!("failure-{}-{}.json", i, report.predicate));
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        eprintln!("   Saved {}", path.display());
    }
    Ok(())
}

fn print_summary(summary: &FuzzSummary) {
    println!(
        "\n{} {} run(s), {} call(s), {} revert(s) | seed {}",
        "📊".cyan(),
        summary.runs,
        summary.calls,
        summary.reverts,
        summary.seed
    );
    for (action, stats) in &summary.actions {
        println!(
            "   {:<14} calls: {:>6}  reverts: {:>6}",
            action.name(),
            stats.calls,
            stats.reverts
        );
    }

    if summary.passed() {
        println!(
            "\n{} All invariants held: {}",
            "✅".green(),
            summary.invariants.join(", ")
        );
        return;
    }

    for report in &summary.failures {
        println!(
            "\n{} Invariant broken: {}",
            "❌".red(),
            report.predicate.bold()
        );
        if report.failed_at_setup() {
            println!("   Fails right after setup, before any call.");
            continue;
        }
        println!(
            "   Run {} | shrunk {} -> {} call(s)",
            report.run_index,
            report.original_length,
            report.sequence.len()
        );
        for (i, step) in report.sequence.iter().enumerate() {
            println!("   {} [{}] {}", "->".red(), i, step.call);
        }
    }
}
