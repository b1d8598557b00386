use chrono::Local;
use log::info;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::loader;
use crate::table::ProductTable;

/// Serialize a table to xlsx bytes: bold header row, one row per record
pub fn table_to_xlsx(table: &ProductTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let bold = Format::new().set_bold();

    let raw = table.to_raw();
    for (c, header) in raw.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, header, &bold)?;
    }
    for (r, row) in raw.rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string((r + 1) as u32, c as u16, value)?;
            }
        }
    }

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}

/// Serialize a table to UTF-8 CSV with the storage headers
pub fn table_to_csv(table: &ProductTable) -> Result<Vec<u8>> {
    let raw = table.to_raw();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&raw.headers)?;
    for row in &raw.rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| CatalogError::Io(e.into_error()))
}

/// Write the full table to `path`, replacing any existing file
///
/// The extension picks the format, the same way [`loader::load_path`] reads it.
pub fn save_table(table: &ProductTable, path: &Path) -> Result<()> {
    let buffer = match loader::Format::from_name(&path.display().to_string())? {
        loader::Format::Xlsx => table_to_xlsx(table)?,
        loader::Format::Csv => table_to_csv(table)?,
    };
    fs::write(path, buffer)?;
    Ok(())
}

/// Move `path` aside to `<stem>_<YYYYmmdd_HHMMSS>.<ext>` in the same directory
///
/// The original file no longer exists afterwards; the caller is expected to
/// write the replacement right away.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CatalogError::file_read(path.display().to_string(), "invalid file name"))?;
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext),
        None => format!("{}_{}", stem, stamp),
    };
    let backup = path.with_file_name(name);
    fs::rename(path, &backup)?;
    info!("backed up {} to {}", path.display(), backup.display());
    Ok(backup)
}

/// Result of [`TableStore::ensure`]
#[derive(Debug)]
pub struct Ensured {
    pub table: ProductTable,
    /// True when the storage file was missing and the sample was written
    pub created: bool,
}

/// The on-disk product table
///
/// A single writer is assumed: two sessions applying updates at the same
/// time race and the last save wins.
#[derive(Clone, Debug)]
pub struct TableStore {
    path: PathBuf,
    images_dir: PathBuf,
}

impl TableStore {
    pub fn new(path: impl Into<PathBuf>, images_dir: impl Into<PathBuf>) -> Self {
        TableStore {
            path: path.into(),
            images_dir: images_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory against which relative image paths resolve
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<ProductTable> {
        let raw = loader::load_path(&self.path)?;
        ProductTable::from_raw(&raw)
    }

    /// Load the table, creating the sample (and the image directory) if absent
    pub fn ensure(&self) -> Result<Ensured> {
        if self.exists() {
            return Ok(Ensured {
                table: self.load()?,
                created: false,
            });
        }

        fs::create_dir_all(self.base_dir().join(&self.images_dir))?;
        let table = ProductTable::sample();
        self.save(&table)?;
        info!("{} not found, wrote a {}-row sample", self.path.display(), table.len());
        Ok(Ensured { table, created: true })
    }

    pub fn save(&self, table: &ProductTable) -> Result<()> {
        save_table(table, &self.path)
    }

    /// Rename the current file aside; `None` when there is nothing to back up
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        backup_file(&self.path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xlsx_buffer_is_a_zip_archive() {
        let bytes = table_to_xlsx(&ProductTable::sample()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn xlsx_buffer_reads_back_through_loader() {
        let table = ProductTable::sample();
        let bytes = table_to_xlsx(&table).unwrap();
        let raw = loader::load_bytes("sample.xlsx", &bytes).unwrap();
        assert_eq!(ProductTable::from_raw(&raw).unwrap(), table);
    }

    #[test]
    fn csv_buffer_reads_back_through_loader() {
        let table = ProductTable::sample();
        let bytes = table_to_csv(&table).unwrap();
        assert!(bytes.starts_with("系列,型號".as_bytes()));
        let raw = loader::load_bytes("sample.csv", &bytes).unwrap();
        assert_eq!(ProductTable::from_raw(&raw).unwrap(), table);
    }

    #[test]
    fn unknown_extension_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        assert!(save_table(&ProductTable::sample(), &path).is_err());
        assert!(!path.exists());
    }
}
