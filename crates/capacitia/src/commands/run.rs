use std::path::PathBuf;

use anyhow::{Context, Result};
use capacitia_core::outputs::TableOutcome;
use capacitia_core::{run_pipeline, PipelineConfig, PipelineOutput, RunOptions};
use clap::Args;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

use super::load_config;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML configuration file (defaults to ./capacitia.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Input file or glob pattern; repeat for several exports
    #[arg(long = "input", short = 'i')]
    pub inputs: Vec<String>,
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Exact cell value that marks a yes/no column as true
    #[arg(long)]
    pub affirmative_token: Option<String>,
    /// Run every stage except writing the tables
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    fn apply(self, config: &mut PipelineConfig) -> RunOptions {
        if !self.inputs.is_empty() {
            config.inputs = self.inputs;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(token) = self.affirmative_token {
            config.affirmative_token = token;
        }
        RunOptions {
            dry_run: self.dry_run,
        }
    }
}

pub fn handle(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    let options = args.apply(&mut config);

    let output = run_pipeline(&config, options).context("pipeline run failed")?;

    println!("{}", kpi_table(&output));
    if options.dry_run {
        println!("Dry run: nothing was written to {}", config.output_dir.display());
    } else {
        println!("{}", tables_table(&output));
        println!("Tables written to {}", config.output_dir.display());
    }
    Ok(())
}

fn kpi_table(output: &PipelineOutput) -> Table {
    let kpis = &output.summary.kpis;
    let stats = &output.summary.normalization;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["metric", "value"]);
    table.add_row(vec!["rows read".to_string(), stats.rows_read.to_string()]);
    table.add_row(vec![
        "rows dropped (no event)".to_string(),
        stats.dropped_blank_event.to_string(),
    ]);
    table.add_row(vec![
        "rows dropped (total markers)".to_string(),
        stats.dropped_total_marker.to_string(),
    ]);
    table.add_row(vec!["participants".to_string(), kpis.participants.to_string()]);
    table.add_row(vec!["events".to_string(), kpis.events.to_string()]);
    table.add_row(vec![
        "organizations".to_string(),
        kpis.organizations.to_string(),
    ]);
    table.add_row(vec!["certified".to_string(), kpis.certified.to_string()]);
    table.add_row(vec![
        "certification rate".to_string(),
        format!("{:.2}%", kpis.certification_pct),
    ]);
    table
}

fn tables_table(output: &PipelineOutput) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["table", "status", "rows", "file"]);

    for report in &output.summary.tables {
        let row = match &report.outcome {
            TableOutcome::Written { file, rows } => vec![
                report.table.to_string(),
                "written".to_string(),
                rows.to_string(),
                file.clone(),
            ],
            TableOutcome::Skipped { reason } => vec![
                report.table.to_string(),
                format!("skipped ({reason})"),
                "0".to_string(),
                String::new(),
            ],
        };
        table.add_row(row);
    }
    table
}
