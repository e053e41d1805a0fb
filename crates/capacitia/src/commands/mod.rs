pub mod inspect;
pub mod run;
pub mod show;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capacitia_core::PipelineConfig;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "capacitia.toml";
pub const INPUTS_ENV: &str = "CAPACITIA_INPUTS";
pub const OUTPUT_DIR_ENV: &str = "CAPACITIA_OUTPUT_DIR";

/// Defaults, then the TOML file (explicit path or `capacitia.toml` in the working
/// directory), then `CAPACITIA_*` environment variables. Command-line flags are
/// applied by each command afterwards.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            debug!(path = DEFAULT_CONFIG_FILE, "using configuration from working directory");
            PipelineConfig::load(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("failed to load {DEFAULT_CONFIG_FILE}"))?
        }
        None => PipelineConfig::default(),
    };

    apply_env_overrides(
        &mut config,
        std::env::var(INPUTS_ENV).ok(),
        std::env::var(OUTPUT_DIR_ENV).ok(),
    );
    Ok(config)
}

/// `inputs` is a comma-separated list of paths or glob patterns.
pub fn apply_env_overrides(
    config: &mut PipelineConfig,
    inputs: Option<String>,
    output_dir: Option<String>,
) {
    if let Some(inputs) = inputs {
        let patterns: Vec<String> = inputs
            .split(',')
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(str::to_string)
            .collect();
        if !patterns.is_empty() {
            config.inputs = patterns;
        }
    }
    if let Some(dir) = output_dir.filter(|dir| !dir.trim().is_empty()) {
        config.output_dir = PathBuf::from(dir.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_inputs_replace_configured_ones() {
        let mut config = PipelineConfig::default();
        apply_env_overrides(
            &mut config,
            Some(" a.csv, exports/*.csv ,".to_string()),
            Some("out".to_string()),
        );
        assert_eq!(config.inputs, vec!["a.csv", "exports/*.csv"]);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = PipelineConfig::default();
        let before = config.inputs.clone();
        apply_env_overrides(&mut config, Some(" , ".to_string()), Some("  ".to_string()));
        assert_eq!(config.inputs, before);
        assert_eq!(
            config.output_dir,
            PathBuf::from(capacitia_core::config::DEFAULT_OUTPUT_DIR)
        );
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capacitia.toml");
        std::fs::write(&path, "affirmative_token = \"S\"\nheader_search_rows = 3\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.affirmative_token, "S");
        assert_eq!(config.header_search_rows, 3);
    }
}
