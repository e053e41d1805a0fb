use std::path::PathBuf;

use anyhow::{Context, Result};
use capacitia_core::pipelines::inspect_source;
use clap::Args;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

use super::load_config;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Export to inspect
    pub file: PathBuf,
    /// Configuration providing extra column aliases
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn handle(args: InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let inspection = inspect_source(&args.file, &config)
        .with_context(|| format!("failed to inspect {}", args.file.display()))?;
    let schema = &inspection.schema;

    println!("file:       {}", args.file.display());
    println!("encoding:   {}", schema.encoding);
    println!("delimiter:  {}", schema.delimiter);
    println!("header row: {}", schema.header_row + 1);
    println!("data rows:  {}", inspection.rows);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "header", "column", "field"]);
    for (idx, (label, column)) in schema.labels.iter().zip(&schema.columns).enumerate() {
        let field = inspection
            .fields
            .get(idx)
            .copied()
            .flatten()
            .map(|field| field.name())
            .unwrap_or("-");
        table.add_row(vec![
            (idx + 1).to_string(),
            label.clone(),
            column.clone(),
            field.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
