use crate::cleaning::constants::*;
use crate::cleaning::error::{CleanError, Result};
use crate::cleaning::field::canonical_field;
use crate::cleaning::parser::CleanedRow;

/// Rectangular header + rows view over a raw CSV text.
///
/// Parsing is a pure transformation: the input text is sanitized, the
/// separator is auto-detected from the header line, and every cell is
/// trimmed. Structural problems are reported through `validate`, which
/// rejects the whole file rather than salvaging individual rows.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self> {
        let content = sanitize(text);
        let mut lines = content.split('\n');

        let header_line = lines
            .next()
            .ok_or_else(|| CleanError::Validation("Empty CSV file".to_string()))?;

        let separator = if header_line.contains(';') { ';' } else { ',' };

        let headers: Vec<String> = header_line
            .split(separator)
            .map(|h| h.trim().to_string())
            .collect();

        let rows: Vec<Vec<String>> = lines
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                line.split(separator)
                    .map(|cell| cell.trim().to_string())
                    .collect()
            })
            .collect();

        Ok(Self { headers, rows })
    }

    pub fn validate(&self) -> Result<()> {
        if self.headers.is_empty() || self.headers.iter().all(|h| h.is_empty()) {
            return Err(CleanError::Validation("CSV file has no headers".to_string()));
        }

        let header_count = self.headers.len();
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != header_count {
                return Err(CleanError::Validation(format!(
                    "Row {} has {} cells, expected {}",
                    index + 1,
                    row.len(),
                    header_count
                )));
            }
        }

        Ok(())
    }

    /// Re-serializes the raw table. Round-trips cell values modulo
    /// surrounding whitespace.
    pub fn to_csv(&self) -> String {
        let separator = EXPORT_SEPARATOR.to_string();
        let mut out = String::new();
        out.push_str(&self.headers.join(&separator));
        for row in &self.rows {
            out.push('\n');
            out.push_str(&row.join(&separator));
        }
        out
    }
}

/// Re-serializes cleaned rows for download: original header order, every
/// value quoted, fields joined with `;`, and a leading byte-order mark so
/// spreadsheet tools pick up the UTF-8 encoding. Null values render as the
/// `-` placeholder the viewer uses.
pub fn export_cleaned(headers: &[String], cleaned_rows: &[CleanedRow]) -> String {
    let separator = EXPORT_SEPARATOR.to_string();
    let mut out = String::from(UTF8_BOM);

    let header_line: Vec<String> = headers.iter().map(|h| quote_cell(h)).collect();
    out.push_str(&header_line.join(&separator));

    for row in cleaned_rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|header| {
                let value = lookup_value(header, row).unwrap_or("-");
                quote_cell(value)
            })
            .collect();
        out.push('\n');
        out.push_str(&cells.join(&separator));
    }

    out
}

/// Field lookup for one header. Successful rows answer with canonical field
/// names; failure placeholders echo the display header instead, so both are
/// accepted.
fn lookup_value<'a>(header: &str, row: &'a CleanedRow) -> Option<&'a str> {
    let canonical = canonical_field(header);
    let lowered = header.trim().to_lowercase();

    row.cleaned_data
        .iter()
        .find(|item| {
            let field = item.field.to_lowercase();
            canonical.map_or(false, |c| field == c) || field == lowered
        })
        .and_then(|item| item.value.as_deref())
        .filter(|value| !value.is_empty())
}

/// Strips angle brackets and control characters the browser original refused
/// to let through. Tabs, newlines and carriage returns survive.
pub fn sanitize(content: &str) -> String {
    content
        .chars()
        .filter(|&c| {
            if c == '<' || c == '>' {
                return false;
            }
            if c == '\t' || c == '\n' || c == '\r' {
                return true;
            }
            !(c.is_control() || ('\u{7f}'..='\u{9f}').contains(&c))
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Quotes a single cell for export, doubling embedded quotes.
pub fn quote_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
