//! Recovers article records from the normalized text dump.
//!
//! Each article is announced by a `17 POSITIONSDATEN` line. Within a
//! segment, field codes (`17e`, `17.1a`, ...) and their values arrive
//! on separate lines, and the table extraction sometimes emits values
//! ahead of their codes. The parser pairs codes to values positionally
//! in a single scan, carrying unassigned values forward until a code
//! group claims them.


use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use lazy_regex::{regex, regex_captures, regex_is_match};
use thiserror::Error;

/// Concrete parse failure that callers may match on.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("no '17 POSITIONSDATEN' blocks found in input")]
    NoRecordsFound,
}

/// One parsed article record.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct Article {
    /// Fields of the main (`17x`) sub-record, in encounter order.
    pub main: IndexMap<String, String>,
    /// Fields of the package (`17.1x`) sub-record, if any were seen.
    pub package: Option<IndexMap<String, String>>,
    /// Value lines left unassigned at the end of the segment. Signals
    /// an alignment irregularity; surfaced for diagnostics, never
    /// silently discarded here.
    pub unmapped: Vec<String>,
}

/// Parses the whole normalized dump into article records.
pub fn parse_articles(text: &str) -> Result<Vec<Article>> {
    let segments = split_segments(text)?;
    Ok(segments.into_iter().map(parse_segment).collect())
}

/// Splits the dump into per-article segments, each spanning from one
/// `17 POSITIONSDATEN` marker to the next (the final segment runs to
/// the end of the text). Fails with [ParseError::NoRecordsFound] when
/// no marker is present.
pub fn split_segments(text: &str) -> Result<Vec<&str>> {
    let starts: Vec<usize> = regex!(r#"(?im)^\s*"?\s*17 POSITIONSDATEN\b"#)
        .find_iter(text)
        .map(|m| m.start())
        .collect();
    if starts.is_empty() {
        return Err(anyhow!(ParseError::NoRecordsFound));
    }

    Ok(starts
        .iter()
        .enumerate()
        .map(|(idx, &start)| {
            let end = starts.get(idx + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect())
}

/// Parses one segment's lines into an [Article].
///
/// Single left-to-right scan over the line list with a cursor.
/// `pending` holds value lines read before any code claimed them; the
/// next code group consumes them ahead of its own trailing values.
pub fn parse_segment(segment: &str) -> Article {
    let mut lines: Vec<&str> = segment
        .lines()
        .map(|line| line.trim().trim_matches('"').trim())
        .filter(|line| !line.is_empty())
        .collect();
    if lines.first().is_some_and(|line| is_segment_marker(line)) {
        lines.remove(0);
    }

    let mut main: IndexMap<String, String> = IndexMap::new();
    let mut package: IndexMap<String, String> = IndexMap::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        // Structural marker announcing the package sub-block; consumed
        // without recording anything.
        if is_pack_header(lines[i]) {
            i += 1;
            continue;
        }

        // Maximal run of consecutive code lines.
        let mut codes: Vec<(&str, &str)> = Vec::new();
        while i < lines.len() {
            match match_code(lines[i]) {
                Some(code_label) => {
                    codes.push(code_label);
                    i += 1;
                }
                None => break,
            }
        }

        // No codes at the cursor: the following value lines are
        // orphans for a later code group.
        if codes.is_empty() {
            while i < lines.len() && is_value_line(lines[i]) {
                pending.push(lines[i]);
                i += 1;
            }
            continue;
        }

        // Values available to this code group: carried-over orphans
        // first, then the lines directly after the codes.
        let mut available = pending;
        while i < lines.len() && is_value_line(lines[i]) {
            available.push(lines[i]);
            i += 1;
        }

        // Positional alignment; codes beyond the value count get an
        // empty value rather than an error.
        for (idx, (code, label)) in codes.iter().enumerate() {
            let value = available.get(idx).copied().unwrap_or("");
            let target = if is_package_code(code) {
                &mut package
            } else {
                &mut main
            };
            target.insert((*label).to_string(), value.to_string());
        }

        // Values beyond the code count stay pending for the next group.
        pending = if available.len() > codes.len() {
            available.split_off(codes.len())
        } else {
            Vec::new()
        };
    }

    Article {
        main,
        package: if package.is_empty() { None } else { Some(package) },
        unmapped: pending.into_iter().map(str::to_string).collect(),
    }
}

/// Matches a field-code line, returning the code and its label. A code
/// line with no trailing text labels itself, keeping its value
/// addressable downstream.
fn match_code(line: &str) -> Option<(&str, &str)> {
    let (_, code, label) = regex_captures!(r"(?i)^(17(?:\.\d+)?[a-z])(?:\s+(.*))?$", line)?;
    let label = label.trim();
    Some((code, if label.is_empty() { code } else { label }))
}

/// `true` for the structural line announcing the package sub-block.
/// Both spellings, PACKSTÜCKE and PACKSTUECKE, occur in the wild.
fn is_pack_header(line: &str) -> bool {
    regex_is_match!(r"(?i)^17(?:\.\d+)?\s+PACKST[ÜU]E?CKE\b", line)
}

fn is_segment_marker(line: &str) -> bool {
    regex_is_match!(r#"(?i)^\s*"?\s*17 POSITIONSDATEN\b"#, line)
}

/// Routes a code to the package sub-record. Pure predicate over the
/// code text, independent of parse order.
fn is_package_code(code: &str) -> bool {
    code.to_ascii_lowercase().starts_with("17.1")
}

fn is_value_line(line: &str) -> bool {
    match_code(line).is_none() && !is_segment_marker(line) && !is_pack_header(line)
}
