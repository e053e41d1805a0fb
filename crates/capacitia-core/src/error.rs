use std::path::PathBuf;

use capacitia_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source file not found; attempted: {attempted:?}")]
    SourceNotFound { attempted: Vec<PathBuf> },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParserError,
    },

    #[error("required column '{field}' missing from {}; expected one of {aliases:?}", .path.display())]
    MissingColumn {
        path: PathBuf,
        field: &'static str,
        aliases: Vec<String>,
    },

    #[error("invalid {vocabulary} vocabulary: {message}")]
    Vocabulary {
        vocabulary: &'static str,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output path {} is a directory; refusing to replace it", .path.display())]
    OutputBlocked { path: PathBuf },

    #[error("failed to replace output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
