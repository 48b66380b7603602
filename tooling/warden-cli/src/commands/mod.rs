pub mod init;
pub mod list;
pub mod replay;
pub mod run;

use std::fs;
use std::path::Path;
use tracing::debug;
use warden_core::WardenConfig;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = ".warden.toml";

/// Reads `path`, or the project file in the current directory when `path` is
/// `None`. A missing project file yields the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<WardenConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = std::env::current_dir()?.join(CONFIG_FILE);
            if !default.exists() {
                debug!("no {} found, using defaults", CONFIG_FILE);
                return Ok(WardenConfig::default());
            }
            default
        }
    };
    let content = fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    let config: WardenConfig = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_fills_missing_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "invariants = [\"solvency_balances_naive\"]\n\n[fuzz]\nruns = 3\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.invariants, vec!["solvency_balances_naive"]);
        assert_eq!(config.fuzz.runs, 3);
        assert_eq!(config.fuzz.depth, 32);
        assert!(config.handler.ghost_tracks_fallback);
    }

    #[test]
    fn test_load_config_rejects_bad_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "[fuzz\nruns = ").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
