use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use warden_core::{FuzzConfig, HandlerConfig, WardenConfig};

use super::CONFIG_FILE;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force overwrite existing configuration file
    #[arg(short, long)]
    pub force: bool,
}

pub struct ConfigGenerator;

impl ConfigGenerator {
    pub fn generate_default_config() -> WardenConfig {
        WardenConfig {
            invariants: vec![
                "solvency_deposits".to_string(),
                "solvency_balances".to_string(),
                "depositor_balance".to_string(),
            ],
            fuzz: FuzzConfig {
                seed: Some(0),
                target_actions: vec![
                    "^deposit$".to_string(),
                    "^withdraw$".to_string(),
                    "fallback".to_string(),
                    "transfer".to_string(),
                    "approve".to_string(),
                ],
                ..FuzzConfig::default()
            },
            handler: HandlerConfig::default(),
        }
    }
}

pub struct FileWriter;

impl FileWriter {
    pub fn config_exists(path: &Path) -> bool {
        path.join(CONFIG_FILE).exists()
    }

    pub fn write_config(config: &WardenConfig, path: &Path) -> anyhow::Result<PathBuf> {
        let config_path = path.join(CONFIG_FILE);
        let toml_string = toml::to_string_pretty(config)?;
        fs::write(&config_path, toml_string)?;
        Ok(config_path)
    }
}

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn display_success(config_path: &Path) {
        println!("{} Configuration file created successfully!", "✓".green());
        println!("   Location: {}", config_path.display());
    }

    pub fn display_existing_file_warning() {
        eprintln!(
            "{} Configuration file already exists: {}",
            "⚠".yellow(),
            CONFIG_FILE
        );
        eprintln!("   Use --force to overwrite the existing configuration");
    }

    pub fn display_error(error: &anyhow::Error) {
        eprintln!("{} Failed to create configuration file", "✗".red());
        eprintln!("   Error: {}", error);
    }
}

pub fn exec(args: InitArgs) -> anyhow::Result<()> {
    let current_dir = std::env::current_dir()?;

    if FileWriter::config_exists(&current_dir) && !args.force {
        OutputFormatter::display_existing_file_warning();
        std::process::exit(1);
    }

    let config = ConfigGenerator::generate_default_config();

    match FileWriter::write_config(&config, &current_dir) {
        Ok(config_path) => {
            OutputFormatter::display_success(&config_path);
            Ok(())
        }
        Err(e) => {
            OutputFormatter::display_error(&e);
            std::process::exit(1);
        }
    }
}
