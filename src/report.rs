//! Renders transformed rows to the distributable XLSX workbook.

use std::collections::HashMap;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use crate::extraction::rowbuild::{Cell, DataRow, PRODUCT_CODE_COLUMN};

/// Columns summed into the totals row of every sheet.
const TOTAL_COLUMNS: [&str; 6] = [
    "Menge",
    "Bruttomasse",
    "Nettomasse",
    "Anzahl der Packstücke",
    "Alkoholmenge",
    "Alkoholgehalt",
];

/// Summed for column sizing, but its total is not meaningful and the
/// totals cell is left blank.
const ALCOHOL_CONTENT_COLUMN: &str = "Alkoholgehalt";
const PACKAGE_COUNT_COLUMN: &str = "Anzahl der Packstücke";

const DECIMAL_FORMAT: &str = "###0.000";
const INTEGER_FORMAT: &str = "###0";
const TOTALS_BACKGROUND: Color = Color::RGB(0xD9E1F2);
const NUMERIC_COLUMN_WIDTH: f64 = 15.0;

/// XLSX limit on worksheet name length.
const SHEET_NAME_LIMIT: usize = 31;

/// Builds the workbook: an "All" sheet with every row, then one sheet
/// per distinct product code (in first-seen order), each ending in a
/// highlighted totals row.
pub fn build_workbook(rows: &[DataRow]) -> Result<Vec<u8>> {
    let columns = column_order(rows);
    let all: Vec<&DataRow> = rows.iter().collect();

    let mut workbook = Workbook::new();
    write_sheet(workbook.add_worksheet(), "All", &columns, &all)?;

    for code in product_codes(rows) {
        let group: Vec<&DataRow> = rows
            .iter()
            .filter(|row| product_code(row) == Some(code.as_str()))
            .collect();
        write_sheet(workbook.add_worksheet(), &sheet_name(&code), &columns, &group)?;
    }

    workbook
        .save_to_buffer()
        .with_context(|| "serialising workbook")
}

fn write_sheet(
    worksheet: &mut Worksheet,
    name: &str,
    columns: &[String],
    rows: &[&DataRow],
) -> Result<()> {
    worksheet
        .set_name(name)
        .with_context(|| format!("naming sheet {name:?}"))?;

    let header_format = Format::new().set_bold();
    let number_format = Format::new().set_num_format(DECIMAL_FORMAT);
    let integer_format = Format::new().set_num_format(INTEGER_FORMAT);
    let totals_format = Format::new()
        .set_bold()
        .set_background_color(TOTALS_BACKGROUND)
        .set_num_format(DECIMAL_FORMAT);
    let totals_integer_format = Format::new()
        .set_bold()
        .set_background_color(TOTALS_BACKGROUND)
        .set_num_format(INTEGER_FORMAT);
    let totals_text_format = Format::new().set_bold().set_background_color(TOTALS_BACKGROUND);

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, column, &header_format)?;
        if TOTAL_COLUMNS.contains(&column.as_str()) {
            worksheet.set_column_width(col, NUMERIC_COLUMN_WIDTH)?;
        }
    }

    for (row_idx, row) in rows.iter().enumerate() {
        let sheet_row = (row_idx + 1) as u32;
        for (col, column) in columns.iter().enumerate() {
            let col = col as u16;
            match row.get(column.as_str()) {
                Some(Cell::Text(text)) => {
                    worksheet.write_string(sheet_row, col, text)?;
                }
                Some(Cell::Number(value)) => {
                    worksheet.write_number_with_format(sheet_row, col, *value, &number_format)?;
                }
                Some(Cell::Int(value)) => {
                    worksheet.write_number_with_format(
                        sheet_row,
                        col,
                        *value as f64,
                        &integer_format,
                    )?;
                }
                None => {}
            }
        }
    }

    let totals = totals_row(rows);
    let totals_idx = (rows.len() + 1) as u32;
    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        if column == PRODUCT_CODE_COLUMN {
            worksheet.write_string_with_format(totals_idx, col, "TOTAL", &totals_text_format)?;
        } else if column == ALCOHOL_CONTENT_COLUMN {
            // A summed or averaged alcohol content is meaningless.
            worksheet.write_blank(totals_idx, col, &totals_text_format)?;
        } else if column == PACKAGE_COUNT_COLUMN {
            let total = totals.get(column.as_str()).copied().unwrap_or(0.0);
            worksheet.write_number_with_format(totals_idx, col, total, &totals_integer_format)?;
        } else if TOTAL_COLUMNS.contains(&column.as_str()) {
            let total = totals.get(column.as_str()).copied().unwrap_or(0.0);
            worksheet.write_number_with_format(totals_idx, col, total, &totals_format)?;
        } else {
            worksheet.write_blank(totals_idx, col, &totals_text_format)?;
        }
    }

    Ok(())
}

/// Sums the totals columns over the given rows.
fn totals_row(rows: &[&DataRow]) -> HashMap<&'static str, f64> {
    let mut totals = HashMap::new();
    for row in rows {
        for column in TOTAL_COLUMNS {
            let value = match row.get(column) {
                Some(Cell::Number(value)) => *value,
                Some(Cell::Int(value)) => *value as f64,
                _ => continue,
            };
            *totals.entry(column).or_insert(0.0) += value;
        }
    }
    totals
}

/// Union of the rows' columns, in first-seen order.
fn column_order(rows: &[DataRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for column in row.keys() {
            if !columns.iter().any(|existing| existing == column) {
                columns.push(column.clone());
            }
        }
    }
    columns
}

/// Distinct product codes, in first-seen order.
fn product_codes(rows: &[DataRow]) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for row in rows {
        if let Some(code) = product_code(row) {
            if !codes.iter().any(|existing| existing == code) {
                codes.push(code.to_string());
            }
        }
    }
    codes
}

fn product_code(row: &DataRow) -> Option<&str> {
    match row.get(PRODUCT_CODE_COLUMN) {
        Some(Cell::Text(code)) => Some(code.as_str()),
        _ => None,
    }
}

/// Truncates a product code to the worksheet name length limit.
fn sheet_name(code: &str) -> String {
    code.chars().take(SHEET_NAME_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    fn row(entries: &[(&str, Cell)]) -> DataRow {
        entries
            .iter()
            .map(|(column, cell)| (column.to_string(), cell.clone()))
            .collect()
    }

    fn sample_rows() -> Vec<DataRow> {
        vec![
            row(&[
                ("Positionsnummer", Cell::Int(1)),
                ("Produktcode", Cell::Text("B000".to_string())),
                ("Menge", Cell::Number(1000.0)),
                ("Bruttomasse", Cell::Number(900.5)),
                ("Nettomasse", Cell::Number(850.25)),
                ("Alkoholgehalt", Cell::Number(40.0)),
                ("Anzahl der Packstücke", Cell::Int(5)),
                ("Alkoholmenge", Cell::Number(400.0)),
            ]),
            row(&[
                ("Positionsnummer", Cell::Int(2)),
                ("Produktcode", Cell::Text("W200".to_string())),
                ("Menge", Cell::Number(250.0)),
                ("Bruttomasse", Cell::Number(300.0)),
                ("Nettomasse", Cell::Number(280.0)),
                ("Alkoholgehalt", Cell::Number(12.5)),
                ("Anzahl der Packstücke", Cell::Int(2)),
                ("Alkoholmenge", Cell::Number(31.25)),
            ]),
        ]
    }

    #[test]
    fn sheet_name_truncates_to_31_chars() {
        let code = "a-product-code-that-is-way-longer-than-the-limit";
        let name = sheet_name(code);
        assert_eq!(name.len(), 31);
        assert!(code.starts_with(&name));
    }

    #[test]
    fn sheet_name_keeps_short_codes_intact() {
        assert_eq!(sheet_name("B000"), "B000");
    }

    #[gtest]
    fn totals_sum_numeric_and_integer_cells() {
        let rows = sample_rows();
        let refs: Vec<&DataRow> = rows.iter().collect();

        let totals = totals_row(&refs);

        expect_that!(totals.get("Menge"), some(eq(&1250.0)));
        expect_that!(totals.get("Anzahl der Packstücke"), some(eq(&7.0)));
        expect_that!(totals.get("Alkoholmenge"), some(eq(&431.25)));
    }

    #[test]
    fn column_order_is_first_seen() {
        let rows = vec![
            row(&[("Menge", Cell::Number(1.0))]),
            row(&[
                ("Menge", Cell::Number(2.0)),
                ("Bruttomasse", Cell::Number(3.0)),
            ]),
        ];

        assert_eq!(column_order(&rows), vec!["Menge", "Bruttomasse"]);
    }

    #[test]
    fn product_codes_are_distinct_in_first_seen_order() {
        let mut rows = sample_rows();
        rows.push(rows[0].clone());

        assert_eq!(product_codes(&rows), vec!["B000", "W200"]);
    }

    #[gtest]
    fn builds_workbook_with_group_sheets() -> anyhow::Result<()> {
        let rows = sample_rows();

        let bytes = build_workbook(&rows)?;

        // XLSX is a ZIP container.
        assert_eq!(&bytes[..2], b"PK");
        Ok(())
    }
}
