use calamine::{Data, Reader, Xlsx};
use log::warn;
use serde::Serialize;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::error::{CatalogError, Result};

/// A sheet as read from disk or an upload: one header row, then string cells
///
/// Empty cells read as `""`, so every row is padded to the header width.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Index of a header, compared after trimming
    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell text by row index and header name
    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// Supported upload and storage formats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Xlsx,
    Csv,
}

impl Format {
    /// Detect the format from a file name's extension
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("xlsx") => Ok(Format::Xlsx),
            Some("csv") => Ok(Format::Csv),
            Some(ext) => Err(CatalogError::file_read(name, format!("unsupported file extension: {}", ext))),
            None => Err(CatalogError::file_read(name, "file has no extension")),
        }
    }
}

/// Load the first worksheet of an xlsx file or a csv file, by extension
///
/// # Examples
/// ```no_run
/// use catalog::loader::load_path;
///
/// match load_path("coatings_example.xlsx") {
///     Ok(raw) => println!("{} rows", raw.rows.len()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_path(path: impl AsRef<Path>) -> Result<RawTable> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| CatalogError::file_read(&display, e))?;
    load_bytes(&display, &bytes)
}

/// Load an uploaded file held in memory; `name` picks the format
pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<RawTable> {
    match Format::from_name(name)? {
        Format::Xlsx => from_xlsx(name, Cursor::new(bytes)),
        Format::Csv => from_csv(name, bytes),
    }
}

/// Read the first worksheet of a workbook
pub fn from_xlsx<RS: Read + Seek>(name: &str, reader: RS) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = Xlsx::new(reader).map_err(|e| CatalogError::file_read(name, e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CatalogError::file_read(name, "no sheets found in workbook"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CatalogError::file_read(name, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_text).map(|h| h.trim().to_string()).collect(),
        None => return Ok(RawTable::default()),
    };

    let width = headers.len();
    let body = rows
        .map(|row| {
            let mut cells: Vec<String> = row.iter().map(cell_text).collect();
            cells.resize(width, String::new());
            cells
        })
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    Ok(RawTable { headers, rows: body })
}

/// Read a comma-separated file with a header row
///
/// A leading UTF-8 BOM is ignored. Rows that cannot be decoded are skipped
/// with a warning; short rows are padded with empty cells.
pub fn from_csv(name: &str, bytes: &[u8]) -> Result<RawTable> {
    let bytes = bytes.strip_prefix("\u{FEFF}".as_bytes()).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CatalogError::file_read(name, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let width = headers.len();
    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("{}: skipping malformed CSV record {}: {}", name, line + 2, e);
                continue;
            }
        };
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(width, String::new());
        rows.push(cells);
    }

    Ok(RawTable { headers, rows })
}

// Integral floats print without a fractional part so "2" survives a
// round-trip through a numeric cell.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_headers_are_trimmed_and_rows_padded() {
        let raw = from_csv("up.csv", "\u{FEFF}sku , name,base_price\nA1,Foo\n".as_bytes()).unwrap();
        assert_eq!(raw.headers, vec!["sku", "name", "base_price"]);
        assert_eq!(raw.rows, vec![vec!["A1".to_string(), "Foo".to_string(), String::new()]]);
        assert_eq!(raw.get(0, "name"), Some("Foo"));
    }

    #[test]
    fn csv_keeps_quoted_commas() {
        let raw = from_csv("up.csv", b"sku,features\nA1,\"a, b;c\"\n").unwrap();
        assert_eq!(raw.get(0, "features"), Some("a, b;c"));
    }

    #[test]
    fn format_comes_from_extension() {
        assert_eq!(Format::from_name("Update.XLSX").unwrap(), Format::Xlsx);
        assert_eq!(Format::from_name("rows.csv").unwrap(), Format::Csv);
        assert!(matches!(
            Format::from_name("notes.txt"),
            Err(CatalogError::FileRead { .. })
        ));
    }

    #[test]
    fn malformed_workbook_is_a_read_failure() {
        let err = load_bytes("broken.xlsx", b"not a zip archive").unwrap_err();
        assert!(matches!(err, CatalogError::FileRead { .. }));
    }

    #[test]
    fn integral_floats_drop_fraction() {
        assert_eq!(cell_text(&Data::Float(2.0)), "2");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
