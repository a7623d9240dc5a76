//! Renders extracted tables to the raw line dump and normalizes it
//! for the record parser.

use crate::extraction::pdf::ExtractedTable;
use crate::table::Table;

/// Everything from this line onwards is a non-data section of the
/// document and is discarded.
const DOCUMENT_SECTION_MARKER: &str = "18 DOKUMENT – ZERTIFIKAT";

/// The upstream extraction drops the positional code for the unit
/// field; lines starting with this label get it restored.
const UNIT_LABEL: &str = "Mengeneinheit";
const UNIT_CODE_PREFIX: &str = "17w ";

/// Renders tables into the line-oriented text dump consumed by the
/// record parser. Cells within a row become separate lines (cells may
/// themselves contain embedded newlines); empty cells are skipped.
pub fn dump_tables(tables: &[ExtractedTable]) -> String {
    let mut out = String::new();
    for table in tables {
        for row in table.data.iter() {
            for cell in row.iter() {
                if cell.is_empty() {
                    continue;
                }
                out.push_str(cell);
                out.push('\n');
            }
        }
    }
    out
}

/// Cleans the raw dump line by line: strips all double-quote
/// characters, truncates the document at the first
/// `18 DOKUMENT – ZERTIFIKAT` line, and re-prefixes `Mengeneinheit`
/// lines with the `17w` code.
pub fn normalize_dump(raw: &str) -> String {
    let mut out = String::new();
    for line in raw.lines() {
        let line = line.replace('"', "");
        let stripped = line.trim_start();

        if stripped.starts_with(DOCUMENT_SECTION_MARKER) {
            break;
        }

        if stripped.starts_with(UNIT_LABEL) {
            out.push_str(UNIT_CODE_PREFIX);
            out.push_str(stripped);
        } else {
            out.push_str(&line);
        }
        out.push('\n');
    }
    out
}

/// Drops page-header rows ("Seite x von y") that stream extraction
/// picks up from outside the table area.
pub fn strip_page_headers(table: &mut Table) {
    table.drop_rows_where(|row| row.first().is_some_and(|cell| cell.contains("Seite")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Row;

    fn page_table(page: i32, cells: &[&str]) -> ExtractedTable {
        ExtractedTable {
            page,
            data: Table::from([cells.to_vec()]),
        }
    }

    #[test]
    fn dump_skips_empty_cells_and_splits_rows_into_lines() {
        let tables = vec![
            page_table(1, &["17a Menge", "", "1.000,000"]),
            page_table(2, &["17b Bruttomasse"]),
        ];

        assert_eq!(
            dump_tables(&tables),
            "17a Menge\n1.000,000\n17b Bruttomasse\n"
        );
    }

    #[test]
    fn normalize_strips_double_quotes() {
        assert_eq!(normalize_dump("\"17a Menge\"\n"), "17a Menge\n");
    }

    #[test]
    fn normalize_truncates_at_document_section() {
        let raw = "17a Menge\n10\n18 DOKUMENT – ZERTIFIKAT\n17b Bruttomasse\n";
        assert_eq!(normalize_dump(raw), "17a Menge\n10\n");
    }

    #[test]
    fn normalize_reprefixes_unit_lines() {
        assert_eq!(normalize_dump("Mengeneinheit\nLiter\n"), "17w Mengeneinheit\nLiter\n");
    }

    #[test]
    fn strip_page_headers_drops_seite_rows() {
        let mut table = Table::from([
            vec!["Seite 4 von 4"],
            vec!["17a Menge"],
            vec!["10"],
        ]);

        strip_page_headers(&mut table);

        assert_eq!(
            table,
            Table(vec![Row(vec!["17a Menge".to_string()]), Row(vec!["10".to_string()])])
        );
    }
}
