//! End-to-end pipeline from an e-VD PDF to transformed rows.

pub mod pdf;
pub mod recordparse;
pub mod rowbuild;
pub mod textdump;

use std::path::Path;

use anyhow::{Context, Result};

use self::pdf::{ExtractedTable, ExtractionMethod, PageTableReader};
use self::rowbuild::DataRow;

/// Runs the full pipeline on one PDF: lattice table extraction with a
/// per-page stream fallback, dump normalization, record parsing,
/// flattening, and the numeric transform. Stateless; every call parses
/// from scratch.
pub fn extract_rows(reader: &dyn PageTableReader, input_pdf: &Path) -> Result<Vec<DataRow>> {
    let page_count = reader
        .page_count(input_pdf)
        .with_context(|| format!("counting pages of {:?}", input_pdf))?;
    let pages: Vec<i32> = (1..=page_count as i32).collect();

    let mut tables = reader
        .read_tables(input_pdf, &pages, ExtractionMethod::Lattice)
        .with_context(|| format!("extracting tables from {:?}", input_pdf))?;

    // Extraction gap: fewer tables than pages. Retry the uncovered
    // pages with the stream method and append whatever comes back; a
    // failed fallback is not fatal here.
    if tables.len() < page_count {
        for page in missing_pages(&tables, page_count) {
            match reader.read_tables(input_pdf, &[page], ExtractionMethod::Stream) {
                Ok(mut fallback) => {
                    for table in &mut fallback {
                        textdump::strip_page_headers(&mut table.data);
                    }
                    tables.append(&mut fallback);
                }
                Err(err) => {
                    log::warn!("Fallback extraction for page {page} failed: {err:?}");
                }
            }
        }
    }

    let text = textdump::normalize_dump(&textdump::dump_tables(&tables));
    log::debug!("Normalized dump has {} line(s)", text.lines().count());

    let articles = recordparse::parse_articles(&text)?;

    let mut rows = Vec::with_capacity(articles.len());
    for (idx, article) in articles.into_iter().enumerate() {
        if !article.unmapped.is_empty() {
            log::warn!(
                "Article {}: discarding {} unmapped value(s): {:?}",
                idx + 1,
                article.unmapped.len(),
                article.unmapped
            );
        }
        let row = rowbuild::transform(rowbuild::flatten_article(article))
            .with_context(|| format!("transforming article {}", idx + 1))?;
        rows.push(row);
    }

    Ok(rows)
}

fn missing_pages(tables: &[ExtractedTable], page_count: usize) -> Vec<i32> {
    (1..=page_count as i32)
        .filter(|page| !tables.iter().any(|table| table.page == *page))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use anyhow::{Result, anyhow};
    use googletest::prelude::*;

    use super::pdf::{ExtractedTable, ExtractionMethod, PageTableReader};
    use super::rowbuild::Cell;
    use super::*;
    use crate::table::Table;

    #[derive(Clone, Debug, Eq, Hash, PartialEq)]
    struct Call {
        pages: Vec<i32>,
        method: ExtractionMethod,
    }

    struct FakeTableReader {
        page_count: usize,
        calls: Mutex<Vec<Call>>,
        return_tables: HashMap<Call, Vec<(i32, Vec<&'static str>)>>,
    }

    impl FakeTableReader {
        fn new(page_count: usize) -> Self {
            FakeTableReader {
                page_count,
                calls: Mutex::new(Vec::new()),
                return_tables: HashMap::new(),
            }
        }

        fn returns(
            &mut self,
            pages: &[i32],
            method: ExtractionMethod,
            tables: Vec<(i32, Vec<&'static str>)>,
        ) {
            self.return_tables.insert(
                Call {
                    pages: pages.to_vec(),
                    method,
                },
                tables,
            );
        }

        fn calls_snapshot(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PageTableReader for FakeTableReader {
        fn page_count(&self, _pdf_path: &Path) -> Result<usize> {
            Ok(self.page_count)
        }

        fn read_tables(
            &self,
            _pdf_path: &Path,
            pages: &[i32],
            method: ExtractionMethod,
        ) -> Result<Vec<ExtractedTable>> {
            let call = Call {
                pages: pages.to_vec(),
                method,
            };
            let result = self
                .return_tables
                .get(&call)
                .ok_or_else(|| anyhow!("no `return_tables` entry for {:?}", call))
                .map(|tables| {
                    tables
                        .iter()
                        .map(|(page, lines)| ExtractedTable {
                            page: *page,
                            data: Table::from(lines.iter().map(|line| vec![*line])),
                        })
                        .collect()
                });

            self.calls
                .lock()
                .expect("failed to lock `FakeTableReader::calls`")
                .push(call);

            result
        }

        fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    const ARTICLE_ONE: &[&str] = &[
        "17 POSITIONSDATEN",
        "17a Positionsnummer",
        "1",
        "17b Verbrauchsteuer-Produktcode",
        "B000",
        "17c Menge",
        "1.000,000",
        "17d Bruttomasse",
        "900,5",
        "17e Nettomasse",
        "850,25",
        "17f Alkoholgehalt",
        "40,0",
        "17.1 PACKSTÜCKE",
        "17.1a Anzahl der Packstücke",
        "5",
    ];

    const ARTICLE_TWO: &[&str] = &[
        "17 POSITIONSDATEN",
        "17a Positionsnummer",
        "2",
        "17b Verbrauchsteuer-Produktcode",
        "W200",
        "17c Menge",
        "250,000",
        "17d Bruttomasse",
        "300,0",
        "17e Nettomasse",
        "280,0",
        "17f Alkoholgehalt",
        "12,5",
        "17.1 PACKSTÜCKE",
        "17.1a Anzahl der Packstücke",
        "2",
    ];

    fn pdf_path() -> PathBuf {
        PathBuf::from("input.pdf")
    }

    #[gtest]
    fn extracts_and_transforms_articles() -> Result<()> {
        let mut fake = FakeTableReader::new(2);
        fake.returns(
            &[1, 2],
            ExtractionMethod::Lattice,
            vec![(1, ARTICLE_ONE.to_vec()), (2, ARTICLE_TWO.to_vec())],
        );

        let rows = extract_rows(&fake, &pdf_path())?;

        assert_that!(rows, len(eq(2)));
        expect_that!(rows[0].get("Alkoholmenge"), some(eq(&Cell::Number(400.0))));
        expect_that!(
            rows[0].get("Produktcode"),
            some(eq(&Cell::Text("B000".to_string())))
        );
        expect_that!(
            rows[0].get("Anzahl der Packstücke"),
            some(eq(&Cell::Int(5)))
        );
        expect_that!(rows[1].get("Positionsnummer"), some(eq(&Cell::Int(2))));
        Ok(())
    }

    #[gtest]
    fn falls_back_to_stream_for_missing_pages() -> Result<()> {
        let mut fake = FakeTableReader::new(2);
        fake.returns(
            &[1, 2],
            ExtractionMethod::Lattice,
            vec![(1, ARTICLE_ONE.to_vec())],
        );
        let mut fallback_lines = vec!["Seite 2 von 2"];
        fallback_lines.extend_from_slice(ARTICLE_TWO);
        fake.returns(&[2], ExtractionMethod::Stream, vec![(2, fallback_lines)]);

        let rows = extract_rows(&fake, &pdf_path())?;

        assert_that!(rows, len(eq(2)));
        // The page header row from the stream fallback must not leak
        // into the parsed articles.
        expect_that!(
            rows[1].get("Produktcode"),
            some(eq(&Cell::Text("W200".to_string())))
        );
        assert_that!(
            fake.calls_snapshot(),
            eq(&vec![
                Call {
                    pages: vec![1, 2],
                    method: ExtractionMethod::Lattice,
                },
                Call {
                    pages: vec![2],
                    method: ExtractionMethod::Stream,
                },
            ])
        );
        Ok(())
    }

    #[gtest]
    fn fallback_failure_is_not_fatal_when_articles_remain() -> Result<()> {
        let mut fake = FakeTableReader::new(2);
        fake.returns(
            &[1, 2],
            ExtractionMethod::Lattice,
            vec![(1, ARTICLE_ONE.to_vec())],
        );
        // No entry for the stream call: the fake errors, the pipeline
        // proceeds with what lattice extraction produced.

        let rows = extract_rows(&fake, &pdf_path())?;

        assert_that!(rows, len(eq(1)));
        Ok(())
    }

    #[gtest]
    fn no_markers_anywhere_fails_with_no_records_found() {
        let mut fake = FakeTableReader::new(1);
        fake.returns(
            &[1],
            ExtractionMethod::Lattice,
            vec![(1, vec!["unrelated", "lines"])],
        );

        let err = extract_rows(&fake, &pdf_path()).expect_err("must fail");
        assert_that!(
            err.downcast_ref::<recordparse::ParseError>(),
            some(eq(&recordparse::ParseError::NoRecordsFound))
        );
    }
}
