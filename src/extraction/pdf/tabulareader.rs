use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{ExtractedTable, ExtractionMethod, PageTableReader};

#[derive(Deserialize, Debug)]
#[serde(transparent)]
pub struct JsonTableSet(pub Vec<JsonTable>);

#[allow(dead_code)]
#[derive(Deserialize, Debug)]
pub struct JsonTable {
    pub extraction_method: String,
    pub page_number: i32,
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
    pub right: f32,
    pub bottom: f32,
    pub data: Vec<JsonRow>,
}

#[derive(Deserialize, Debug)]
pub struct JsonRow(pub Vec<JsonCell>);

#[allow(dead_code)]
#[derive(Deserialize, Debug)]
pub struct JsonCell {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
}

/// Client wrapper around Tabula.
pub struct TabulaClient {
    vm: tabula::TabulaVM,
}

impl TabulaClient {
    pub fn new(libpath: &str) -> Result<Self> {
        let vm = tabula::TabulaVM::new(libpath, false)?;
        Ok(TabulaClient { vm })
    }
}

impl PageTableReader for TabulaClient {
    fn page_count(&self, pdf_path: &Path) -> Result<usize> {
        let document = lopdf::Document::load(pdf_path)
            .with_context(|| format!("reading PDF {:?} for page count", pdf_path))?;
        Ok(document.get_pages().len())
    }

    fn read_tables(
        &self,
        pdf_path: &Path,
        pages: &[i32],
        method: ExtractionMethod,
    ) -> Result<Vec<ExtractedTable>> {
        let extraction_method = match method {
            ExtractionMethod::Lattice => tabula::ExtractionMethod::Spreadsheet,
            ExtractionMethod::Stream => tabula::ExtractionMethod::Basic,
        };

        let env = self.vm.attach().with_context(|| "attaching to TabulaVM")?;

        let tabula = env
            .configure_tabula(
                None,
                Some(pages),
                tabula::OutputFormat::Json,
                false,
                extraction_method,
                false,
                None,
            )
            .with_context(|| "configuring Tabula to extract tables")?;

        // Tabula writes its JSON output to a file; scope it to this
        // call so it is removed on success and failure alike.
        let extracted_file = tempfile::NamedTempFile::new()?;
        tabula.parse_document_into(pdf_path, extracted_file.path())?;
        let result: JsonTableSet = serde_json::from_reader(extracted_file)
            .with_context(|| "parsing JSON output from Tabula")?;

        Ok(result
            .0
            .into_iter()
            .map(|json_table| {
                let page = json_table.page_number;
                ExtractedTable {
                    page,
                    data: json_table.into(),
                }
            })
            .collect())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
