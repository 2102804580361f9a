//! Table extraction from loosely structured HTML.
//!
//! The HTML5 parser in `scraper` recovers from unclosed cells and stray tags,
//! so judges' hand-written markup still yields rows of named columns.

use scraper::{ElementRef, Html, Selector};

use crate::errors::{Result, StandingsError};

/// One table cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    /// Text content with whitespace collapsed.
    pub value: String,
    /// `href` attributes of links inside the cell, in document order.
    pub links: Vec<String>,
}

impl Cell {
    fn from_element(element: ElementRef<'_>, links: &Selector) -> Self {
        let text: String = element.text().collect();
        Self {
            value: collapse_whitespace(&text),
            links: element
                .select(links)
                .filter_map(|a| a.value().attr("href").map(str::to_string))
                .collect(),
        }
    }

    /// First link of the cell.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.links.first().map(String::as_str)
    }
}

/// A data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRow {
    /// Cells in column order.
    pub columns: Vec<Cell>,
}

/// A table: header names plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Column names from the first qualifying row.
    pub header: Vec<String>,
    /// Remaining rows.
    pub rows: Vec<ParsedRow>,
}

/// Compiles a CSS selector, reporting failures as parse errors.
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| StandingsError::parse(format!("selector {css}"), e.to_string()))
}

/// Collapses runs of whitespace (including non-breaking spaces) to one space.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl ParsedTable {
    /// Parses the first `<table>` of `html`; its first row is the header.
    pub fn parse(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let tables = selector("table")?;
        let Some(table) = document.select(&tables).next() else {
            return Ok(Self::default());
        };
        Self::collect(table.select(&selector("tr")?), 1)
    }

    /// Parses every row matching `row_selector` that has at least
    /// `min_columns` cells; the first such row is the header.
    pub fn from_rows(html: &str, row_selector: &str, min_columns: usize) -> Result<Self> {
        let document = Html::parse_document(html);
        let rows = selector(row_selector)?;
        Self::collect(document.select(&rows), min_columns)
    }

    fn collect<'a>(rows: impl Iterator<Item = ElementRef<'a>>, min_columns: usize) -> Result<Self> {
        let links = selector("a[href]")?;
        let mut table = Self::default();
        let mut have_header = false;

        for row in rows {
            let columns: Vec<Cell> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|e| matches!(e.value().name(), "td" | "th"))
                .map(|e| Cell::from_element(e, &links))
                .collect();
            if columns.len() < min_columns {
                continue;
            }
            if have_header {
                table.rows.push(ParsedRow { columns });
            } else {
                table.header = columns.into_iter().map(|c| c.value).collect();
                have_header = true;
            }
        }
        Ok(table)
    }

    /// Pairs each cell of row `index` with its header name.
    pub fn record(&self, index: usize) -> impl Iterator<Item = (&str, &Cell)> {
        self.header
            .iter()
            .map(String::as_str)
            .zip(self.rows.get(index).into_iter().flat_map(|r| r.columns.iter()))
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
