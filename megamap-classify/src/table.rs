//! Tabular input reading
//!
//! Checklists are distributed as CSV or TSV, sometimes with a few lines of
//! free-text preamble before the header row. The header is located by
//! scanning the first lines for a row that names both a name-like and a
//! code-like column; everything from that row on is parsed as CSV.

use megamap_common::{Error, Result};
use std::path::Path;
use tracing::{info, warn};

/// How many leading lines are scanned for the header row
pub const HEADER_SCAN_LINES: usize = 50;

/// Parsed table: header plus data rows
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Zero-based line index of the header row in the source text
    pub header_line: usize,
    pub delimiter: u8,
}

impl Table {
    /// Parse `text` as a delimited table whose header is on `header_line`
    pub fn from_text(text: &str, header_line: usize, delimiter: u8) -> Result<Self> {
        let body: String = text
            .lines()
            .skip(header_line)
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(row);
        }

        Ok(Self {
            headers,
            rows,
            header_line,
            delimiter,
        })
    }

    /// Cell at `column` of `row`, if the row is long enough
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Every value of one column, `None` where a row is short
    pub fn column(&self, column: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).map(String::as_str))
    }

    pub fn header(&self, column: usize) -> &str {
        self.headers.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Read a checklist file, locating the header row past any preamble
pub fn read_checklist(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    parse_checklist(&text)
}

/// Parse checklist text, locating the header row past any preamble
pub fn parse_checklist(text: &str) -> Result<Table> {
    let text = text.trim_start_matches('\u{feff}');

    let (header_line, delimiter) = match find_header_row(text) {
        Some(found) => {
            info!(
                "Header found on line {} using delimiter {}",
                found.0 + 1,
                delimiter_label(found.1)
            );
            found
        }
        None => {
            let first = text
                .lines()
                .position(|line| !line.trim().is_empty())
                .ok_or_else(|| Error::UnparseableHeader("checklist is empty".to_string()))?;
            let delimiter = guess_delimiter(text.lines().nth(first).unwrap_or(""));
            warn!(
                line = first + 1,
                "No name/code header row found; using first non-empty line as header"
            );
            (first, delimiter)
        }
    };

    Table::from_text(text, header_line, delimiter)
}

/// Read a taxonomy file (header on the first line)
pub fn read_taxonomy(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = guess_delimiter(text.lines().next().unwrap_or(""));
    Table::from_text(text, 0, delimiter)
}

/// Locate the header row: comma-separated candidates first, then tabs
fn find_header_row(text: &str) -> Option<(usize, u8)> {
    let lines: Vec<&str> = text.lines().take(HEADER_SCAN_LINES).collect();

    for delimiter in [b',', b'\t'] {
        let sep = delimiter as char;
        if let Some(idx) = lines
            .iter()
            .position(|line| line.contains(sep) && looks_like_header(line, sep))
        {
            return Some((idx, delimiter));
        }
    }
    None
}

/// A header row has at least two cells, one mentioning "name" and one "code"
pub fn looks_like_header(line: &str, sep: char) -> bool {
    let tokens: Vec<String> = line
        .split(sep)
        .map(|t| t.trim().trim_matches('"').trim().to_lowercase())
        .collect();
    if tokens.len() < 2 {
        return false;
    }
    let has_name = tokens.iter().any(|t| t.contains("name"));
    let has_code = tokens.iter().any(|t| t.contains("code"));
    has_name && has_code
}

/// Tab only when the line has tabs and no commas
fn guess_delimiter(line: &str) -> u8 {
    if line.contains('\t') && !line.contains(',') {
        b'\t'
    } else {
        b','
    }
}

fn delimiter_label(delimiter: u8) -> &'static str {
    if delimiter == b'\t' {
        "TAB"
    } else {
        "COMMA"
    }
}
