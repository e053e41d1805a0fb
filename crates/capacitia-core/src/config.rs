use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use capacitia_parser::DEFAULT_HEADER_SEARCH_ROWS;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::unification::Field;

pub const DEFAULT_INPUT: &str = ".data/raw/dados_gerais_capacitia.csv";
pub const DEFAULT_OUTPUT_DIR: &str = ".data/processed";
pub const DEFAULT_AFFIRMATIVE_TOKEN: &str = "Sim";

/// Settings for one pipeline run, usually read from `capacitia.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Input paths or glob patterns, expanded in order.
    pub inputs: Vec<String>,
    pub output_dir: PathBuf,
    /// Exact token that marks a boolean-like cell as true.
    pub affirmative_token: String,
    pub header_search_rows: usize,
    /// Extra header aliases per logical field, tried before the built-in ones.
    pub column_aliases: BTreeMap<String, Vec<String>>,
    pub vocabulary: VocabularyConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: vec![DEFAULT_INPUT.to_string()],
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            affirmative_token: DEFAULT_AFFIRMATIVE_TOKEN.to_string(),
            header_search_rows: DEFAULT_HEADER_SEARCH_ROWS,
            column_aliases: BTreeMap::new(),
            vocabulary: VocabularyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VocabularyConfig {
    pub organization: VocabularyEntries,
    pub role: VocabularyEntries,
    pub affiliation: VocabularyEntries,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VocabularyEntries {
    /// Variant spelling -> canonical label.
    pub aliases: BTreeMap<String, String>,
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub contains: Vec<String>,
    pub label: String,
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(PipelineError::Config("no input files configured".to_string()));
        }
        if self.affirmative_token.is_empty() {
            return Err(PipelineError::Config(
                "affirmative_token must not be empty".to_string(),
            ));
        }
        if self.header_search_rows == 0 {
            return Err(PipelineError::Config(
                "header_search_rows must be at least 1".to_string(),
            ));
        }
        for name in self.column_aliases.keys() {
            if Field::from_name(name).is_none() {
                return Err(PipelineError::Config(format!(
                    "column_aliases refers to unknown field '{name}'"
                )));
            }
        }
        Ok(())
    }

    /// Expands `inputs` into concrete files. An existing file is taken literally,
    /// even when its name contains glob metacharacters; anything else is a glob
    /// pattern. Every input must match at least one file; otherwise the error
    /// lists everything that was tried.
    pub fn resolve_inputs(&self) -> Result<Vec<PathBuf>> {
        let mut resolved: Vec<PathBuf> = Vec::new();
        let mut missing: Vec<PathBuf> = Vec::new();

        for pattern in &self.inputs {
            let literal = Path::new(pattern);
            if literal.is_file() {
                if !resolved.iter().any(|path| path == literal) {
                    resolved.push(literal.to_path_buf());
                }
                continue;
            }

            let mut matches: Vec<PathBuf> = Vec::new();
            for entry in glob::glob(pattern)? {
                let path = entry.map_err(|err| PipelineError::Io(err.into_error()))?;
                if path.is_file() {
                    matches.push(path);
                }
            }
            matches.sort();

            if matches.is_empty() {
                missing.push(PathBuf::from(pattern));
                continue;
            }

            for path in matches {
                if !resolved.contains(&path) {
                    resolved.push(path);
                }
            }
        }

        if !missing.is_empty() {
            return Err(PipelineError::SourceNotFound { attempted: missing });
        }

        Ok(resolved)
    }
}
