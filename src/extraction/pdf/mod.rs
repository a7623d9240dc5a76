pub mod tabulareader;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use crate::table::Table;

/// Strategy the upstream library uses to recover a table from a page.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExtractionMethod {
    /// Ruled-line detection; the primary strategy for e-VD pages.
    Lattice,
    /// Whitespace-based detection; the fallback for pages where
    /// lattice extraction yields nothing.
    Stream,
}

/// A single table recovered from one PDF page.
#[derive(Debug)]
pub struct ExtractedTable {
    /// One-based page number the table was read from.
    pub page: i32,
    pub data: Table,
}

/// Reads page counts and per-page tables from a PDF. The PDF geometry
/// work behind this trait is an opaque upstream collaborator.
pub trait PageTableReader {
    /// Returns the number of pages in the PDF.
    fn page_count(&self, pdf_path: &Path) -> Result<usize>;

    /// Reads tables from the given one-based pages. Pages without a
    /// detectable table contribute no entry to the result.
    fn read_tables(
        &self,
        pdf_path: &Path,
        pages: &[i32],
        method: ExtractionMethod,
    ) -> Result<Vec<ExtractedTable>>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// CLI arguments relating to configuring the table reader.
#[derive(Args, Clone, Debug)]
pub struct TableReaderArgs {
    /// Path to the Tabula JAR file.
    #[arg(long, default_value = "tabula.jar")]
    tabula_libpath: String,
}

impl TableReaderArgs {
    pub fn build(&self) -> Result<Box<dyn PageTableReader>> {
        let client = tabulareader::TabulaClient::new(&self.tabula_libpath)
            .with_context(|| format!("initialising Tabula from {:?}", self.tabula_libpath))?;
        Ok(Box::new(client))
    }
}
