use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use capacitia_core::frames::Table;
use capacitia_core::outputs::read_table;
use clap::Args;

use super::load_config;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Table name, e.g. event_summary
    pub table: String,
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Maximum number of rows to print
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn handle(args: ShowArgs) -> Result<()> {
    let Some(table) = Table::from_name(&args.table) else {
        let known: Vec<&str> = Table::ALL.iter().map(|table| table.name()).collect();
        bail!(
            "unknown table '{}'; expected one of: {}",
            args.table,
            known.join(", ")
        );
    };

    let output_dir = match args.output_dir {
        Some(dir) => dir,
        None => load_config(args.config.as_deref())?.output_dir,
    };

    let df = read_table(&output_dir, table).with_context(|| {
        format!(
            "failed to read {} from {}",
            table.file_name(),
            output_dir.display()
        )
    })?;
    println!("{}", df.head(Some(args.limit)));
    Ok(())
}
