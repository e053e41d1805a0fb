use std::fs;
use std::path::{Path, PathBuf};

use capacitia_parser::{parse_raw_table, DetectOptions, RawTable, SourceSchema, TextEncoding};
use serde::Serialize;
use tracing::info;

use crate::aggregation::{aggregate, DerivedTables, ProgrammeKpis};
use crate::canonical::Canonicalizer;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::frames::build_frames;
use crate::normalizer::{NormalizationStats, NormalizedBatch, RecordNormalizer};
use crate::outputs::{Materializer, StagedTable, TableReport, RUN_SUMMARY_FILE};
use crate::records::CanonicalRecord;
use crate::unification::{field_aliases, ColumnBindings, Field};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run every stage except the materializer.
    pub dry_run: bool,
}

/// One decoded input file with its column bindings, ready for normalization.
#[derive(Debug)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub content_hash: String,
    pub table: RawTable,
    pub bindings: ColumnBindings,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub path: String,
    pub blake3: String,
    pub encoding: TextEncoding,
    pub delimiter: String,
    pub header_row: usize,
    #[serde(flatten)]
    pub stats: NormalizationStats,
}

/// Manifest written next to the tables as `run_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub sources: Vec<SourceSummary>,
    pub normalization: NormalizationStats,
    pub kpis: ProgrammeKpis,
    pub tables: Vec<TableReport>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub records: Vec<CanonicalRecord>,
    pub tables: DerivedTables,
    pub summary: RunSummary,
}

/// Column-level view of a single source, used by `capacitia inspect`.
#[derive(Debug, Clone)]
pub struct SourceInspection {
    pub schema: SourceSchema,
    pub rows: usize,
    /// Logical field bound to each column position, if any.
    pub fields: Vec<Option<Field>>,
}

pub fn detect_options(config: &PipelineConfig) -> DetectOptions {
    DetectOptions {
        required_labels: field_aliases(Field::Event, &config.column_aliases),
        header_search_rows: config.header_search_rows,
    }
}

pub fn load_source(path: &Path, config: &PipelineConfig) -> Result<LoadedSource> {
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => PipelineError::SourceNotFound {
            attempted: vec![path.to_path_buf()],
        },
        _ => PipelineError::Io(err),
    })?;
    let content_hash = blake3::hash(&bytes).to_hex().to_string();

    let table =
        parse_raw_table(&bytes, &detect_options(config)).map_err(|source| PipelineError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let bindings = ColumnBindings::resolve(&table.schema, &config.column_aliases, path)?;

    info!(
        path = %path.display(),
        encoding = %table.schema.encoding,
        delimiter = %table.schema.delimiter,
        header_row = table.schema.header_row,
        rows = table.len(),
        "loaded source"
    );

    Ok(LoadedSource {
        path: path.to_path_buf(),
        content_hash,
        table,
        bindings,
    })
}

pub fn inspect_source(path: &Path, config: &PipelineConfig) -> Result<SourceInspection> {
    let source = load_source(path, config)?;
    let mut fields = vec![None; source.table.schema.columns.len()];
    for (field, idx) in source.bindings.bound() {
        fields[idx] = Some(field);
    }

    Ok(SourceInspection {
        rows: source.table.len(),
        schema: source.table.schema,
        fields,
    })
}

/// Runs the whole pipeline for `config`. Every fatal condition (vocabulary,
/// missing input, undecodable file, missing event column) is checked before the
/// first output is written, and every output is staged before any is replaced.
pub fn run_pipeline(config: &PipelineConfig, options: RunOptions) -> Result<PipelineOutput> {
    config.validate()?;
    let canonicalizer = Canonicalizer::from_config(&config.vocabulary)?;

    let paths = config.resolve_inputs()?;
    let sources = paths
        .iter()
        .map(|path| load_source(path, config))
        .collect::<Result<Vec<_>>>()?;

    let normalizer = RecordNormalizer::new(&canonicalizer, &config.affirmative_token);
    let mut batch = NormalizedBatch::default();
    let mut source_summaries = Vec::with_capacity(sources.len());
    for source in &sources {
        let normalized = normalizer.normalize(&source.table, &source.bindings);
        info!(
            path = %source.path.display(),
            kept = normalized.stats.rows_kept,
            dropped_blank_event = normalized.stats.dropped_blank_event,
            dropped_total_marker = normalized.stats.dropped_total_marker,
            "normalized source"
        );
        source_summaries.push(SourceSummary {
            path: source.path.display().to_string(),
            blake3: source.content_hash.clone(),
            encoding: source.table.schema.encoding,
            delimiter: source.table.schema.delimiter.as_char().to_string(),
            header_row: source.table.schema.header_row,
            stats: normalized.stats,
        });
        batch.append(normalized);
    }

    let tables = aggregate(&batch.records);

    let mut summary = RunSummary {
        sources: source_summaries,
        normalization: batch.stats,
        kpis: tables.kpis.clone(),
        tables: Vec::new(),
    };

    if options.dry_run {
        info!("dry run; skipping materialization");
    } else {
        let materializer = Materializer::new(config.output_dir.clone());
        let frames = build_frames(&batch.records, &tables)?;
        let staged = materializer.stage_tables(frames)?;
        summary.tables = staged.iter().map(StagedTable::report).collect();
        let manifest = materializer.stage_json(RUN_SUMMARY_FILE, &summary)?;
        let manifest = materializer.commit(staged, manifest)?;
        info!(
            output_dir = %config.output_dir.display(),
            manifest = %manifest.display(),
            "pipeline run complete"
        );
    }

    Ok(PipelineOutput {
        records: batch.records,
        tables,
        summary,
    })
}
