use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{DataFrame, ParquetReader, SerReader};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::frames::Table;

pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Written { file: String, rows: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: Table,
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

impl TableReport {
    pub fn is_written(&self) -> bool {
        matches!(self.outcome, TableOutcome::Written { .. })
    }
}

/// A table written to a temp file beside its destination but not yet visible.
/// Empty tables carry no file; committing one removes any stale copy instead.
#[derive(Debug)]
pub struct StagedTable {
    table: Table,
    path: PathBuf,
    rows: usize,
    file: Option<NamedTempFile>,
}

impl StagedTable {
    pub fn report(&self) -> TableReport {
        let outcome = match self.file {
            Some(_) => TableOutcome::Written {
                file: self.table.file_name(),
                rows: self.rows,
            },
            None => TableOutcome::Skipped {
                reason: "no rows".to_string(),
            },
        };
        TableReport {
            table: self.table,
            outcome,
        }
    }

    fn commit(self) -> Result<()> {
        match self.file {
            Some(file) => {
                file.persist(&self.path)?;
                info!(table = %self.table, rows = self.rows, path = %self.path.display(), "wrote table");
            }
            None if self.path.exists() => {
                fs::remove_file(&self.path)?;
                info!(table = %self.table, path = %self.path.display(), "removed stale table from a previous run");
            }
            None => {}
        }
        Ok(())
    }
}

/// A staged non-table file such as the run manifest.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file: NamedTempFile,
}

impl StagedFile {
    fn commit(self) -> Result<PathBuf> {
        self.file.persist(&self.path)?;
        Ok(self.path)
    }
}

/// Writes derived tables into one output directory in two phases. Staging
/// writes and syncs every file into a temp file next to its destination; a
/// failure there drops the temp files and leaves the directory as it was.
/// Committing renames the staged files into place, manifest last.
#[derive(Debug, Clone)]
pub struct Materializer {
    output_dir: PathBuf,
}

impl Materializer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.output_dir.join(table.file_name())
    }

    fn ensure_replaceable(path: &Path) -> Result<()> {
        if path.is_dir() {
            return Err(PipelineError::OutputBlocked {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn stage_tables(&self, frames: Vec<(Table, DataFrame)>) -> Result<Vec<StagedTable>> {
        fs::create_dir_all(&self.output_dir)?;
        frames
            .into_iter()
            .map(|(table, mut df)| self.stage_table(table, &mut df))
            .collect()
    }

    pub fn stage_table(&self, table: Table, df: &mut DataFrame) -> Result<StagedTable> {
        let path = self.table_path(table);
        Self::ensure_replaceable(&path)?;

        if df.height() == 0 {
            warn!(table = %table, "table is empty; skipping write");
            return Ok(StagedTable {
                table,
                path,
                rows: 0,
                file: None,
            });
        }

        let mut staged = NamedTempFile::new_in(&self.output_dir)?;
        ParquetWriter::new(staged.as_file_mut())
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(df)?;
        staged.as_file().sync_all()?;
        debug!(table = %table, rows = df.height(), "staged table");

        Ok(StagedTable {
            table,
            path,
            rows: df.height(),
            file: Some(staged),
        })
    }

    /// Pretty JSON with a trailing newline.
    pub fn stage_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<StagedFile> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        Self::ensure_replaceable(&path)?;

        let mut staged = NamedTempFile::new_in(&self.output_dir)?;
        serde_json::to_writer_pretty(staged.as_file_mut(), value)?;
        staged.write_all(b"\n")?;
        staged.as_file().sync_all()?;

        Ok(StagedFile { path, file: staged })
    }

    /// Moves every staged table into place, then the manifest. Returns the
    /// manifest path.
    pub fn commit(&self, tables: Vec<StagedTable>, manifest: StagedFile) -> Result<PathBuf> {
        for staged in tables {
            staged.commit()?;
        }
        manifest.commit()
    }
}

/// Loads a table previously committed by [`Materializer::commit`].
pub fn read_table(output_dir: &Path, table: Table) -> Result<DataFrame> {
    let file = File::open(output_dir.join(table.file_name()))?;
    Ok(ParquetReader::new(file).finish()?)
}
