use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::extraction;
use crate::extraction::pdf::TableReaderArgs;
use crate::report;

/// Extracts article data from an e-VD PDF into an XLSX workbook.
#[derive(Args)]
pub struct Command {
    /// Path to the PDF to extract from.
    input_pdf: PathBuf,

    /// Path to write the XLSX workbook to.
    output: PathBuf,

    #[command(flatten)]
    table_reader: TableReaderArgs,
}

pub fn run(cmd: &Command) -> Result<()> {
    let reader = cmd.table_reader.build()?;

    let result = extract(cmd, reader.as_ref());

    if let Err(err) = reader.close() {
        log::warn!("Failed to shut down table reader: {err}");
    }

    result
}

fn extract(cmd: &Command, reader: &dyn extraction::pdf::PageTableReader) -> Result<()> {
    let rows = extraction::extract_rows(reader, &cmd.input_pdf)?;
    log::info!("Extracted {} row(s) from {:?}", rows.len(), cmd.input_pdf);

    let bytes = report::build_workbook(&rows)?;
    std::fs::write(&cmd.output, bytes)
        .with_context(|| format!("writing workbook to {:?}", cmd.output))?;

    Ok(())
}
