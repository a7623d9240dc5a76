//! Positional table data as recovered from PDF pages by the upstream
//! table extraction.

use std::ops::{Deref, DerefMut};

use crate::extraction::pdf::tabulareader;

#[derive(Debug, Default, Eq, PartialEq)]
pub struct Table(pub Vec<Row>);

impl Table {
    /// Removes rows whose leading cell satisfies `predicate`.
    pub fn drop_rows_where<F>(&mut self, predicate: F)
    where
        F: Fn(&Row) -> bool,
    {
        self.0.retain(|row| !predicate(row));
    }
}

impl Deref for Table {
    type Target = Vec<Row>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Table {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<tabulareader::JsonTable> for Table {
    fn from(value: tabulareader::JsonTable) -> Self {
        Table(value.data.into_iter().map(Into::into).collect())
    }
}

impl<C, R> From<C> for Table
where
    C: IntoIterator<Item = R>,
    R: Into<Row>,
{
    fn from(value: C) -> Self {
        Table(value.into_iter().map(Into::into).collect())
    }
}

/// One table row; cells may contain embedded newlines, which the text
/// dump later splits into separate lines.
#[derive(Debug, Eq, PartialEq)]
pub struct Row(pub Vec<String>);

impl Deref for Row {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Row {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<tabulareader::JsonRow> for Row {
    fn from(value: tabulareader::JsonRow) -> Self {
        Row(value.0.into_iter().map(|cell| cell.text).collect())
    }
}

impl<C, S> From<C> for Row
where
    C: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from(value: C) -> Self {
        Row(value.into_iter().map(Into::into).collect())
    }
}
