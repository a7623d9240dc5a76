//! Flattens parsed articles into rows and applies the numeric
//! transformations of the fixed e-VD schema.

use indexmap::IndexMap;
use thiserror::Error;

use super::recordparse::Article;

/// Columns coerced to numbers by [transform]; all are required.
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "Menge",
    "Bruttomasse",
    "Nettomasse",
    "Alkoholgehalt",
    "Positionsnummer",
    "Anzahl der Packstücke",
];

/// Numeric columns narrowed to integers.
const INTEGER_COLUMNS: [&str; 2] = ["Positionsnummer", "Anzahl der Packstücke"];

const PRODUCT_CODE_SOURCE_COLUMN: &str = "Verbrauchsteuer-Produktcode";
pub const PRODUCT_CODE_COLUMN: &str = "Produktcode";
pub const ALCOHOL_QUANTITY_COLUMN: &str = "Alkoholmenge";
const QUANTITY_COLUMN: &str = "Menge";
const ALCOHOL_CONTENT_COLUMN: &str = "Alkoholgehalt";

/// A flattened article: label to raw text value, in encounter order.
pub type FlatRow = IndexMap<String, String>;

/// A typed cell in a transformed row.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Int(i64),
}

/// A transformed row: column name to typed cell.
pub type DataRow = IndexMap<String, Cell>;

/// Concrete data-quality failures that callers may match on.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TransformError {
    #[error("required column {0:?} is missing")]
    MissingColumn(String),
    #[error("column {column:?} has non-numeric value {value:?}")]
    NumericFormat { column: String, value: String },
}

/// Merges an article's sub-records into one flat row: `main` first,
/// then `package`. Under the source convention their labels never
/// collide; if they do, the package value wins as the later write.
pub fn flatten_article(article: Article) -> FlatRow {
    let mut row = article.main;
    if let Some(package) = article.package {
        row.extend(package);
    }
    row
}

/// Transforms one flat row: numeric coercion, integer narrowing, the
/// derived alcohol quantity, and the product-code rename.
pub fn transform(row: FlatRow) -> Result<DataRow, TransformError> {
    for column in NUMERIC_COLUMNS {
        if !row.contains_key(column) {
            return Err(TransformError::MissingColumn(column.to_string()));
        }
    }

    let mut quantity = 0.0;
    let mut alcohol_content = 0.0;
    let mut out = DataRow::new();
    for (label, value) in &row {
        let cell = if NUMERIC_COLUMNS.contains(&label.as_str()) {
            let number = parse_decimal(value).ok_or_else(|| numeric_error(label, value))?;
            if label == QUANTITY_COLUMN {
                quantity = number;
            }
            if label == ALCOHOL_CONTENT_COLUMN {
                alcohol_content = number;
            }
            if INTEGER_COLUMNS.contains(&label.as_str()) {
                if number.fract() != 0.0 {
                    return Err(numeric_error(label, value));
                }
                Cell::Int(number as i64)
            } else {
                Cell::Number(number)
            }
        } else {
            Cell::Text(value.clone())
        };

        let column = if label == PRODUCT_CODE_SOURCE_COLUMN {
            PRODUCT_CODE_COLUMN
        } else {
            label.as_str()
        };
        out.insert(column.to_string(), cell);
    }

    out.insert(
        ALCOHOL_QUANTITY_COLUMN.to_string(),
        Cell::Number(quantity * (alcohol_content / 100.0)),
    );

    Ok(out)
}

fn numeric_error(column: &str, value: &str) -> TransformError {
    TransformError::NumericFormat {
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Parses a decimal in the German convention: `.` groups thousands,
/// `,` separates the decimal part.
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().replace('.', "").replace(',', ".").parse().ok()
}
