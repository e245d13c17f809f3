//! CSV directory workbook.
//!
//! Each worksheet is a `<name>.csv` file inside one directory. Appends go
//! straight to the end of the file; deletes and rewrites write a sibling
//! temp file and rename it over the original.

use crate::storage::traits::{Ledger, Row, Workbook};
use crate::{Error, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// A worksheet stored as a CSV file.
#[derive(Debug)]
pub struct CsvLedger {
    name: String,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvLedger {
    fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self, operation: &'static str) -> Result<Vec<Row>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| Error::store(operation, format!("{}: {e}", self.path.display())))?;
        reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| Error::store(operation, e))
            })
            .collect()
    }

    fn write_rows(&self, operation: &'static str, rows: &[Row]) -> Result<()> {
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp)
                .map_err(|e| Error::store(operation, e))?;
            for row in rows {
                writer
                    .write_record(row)
                    .map_err(|e| Error::store(operation, e))?;
            }
            writer.flush().map_err(|e| Error::store(operation, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| Error::store(operation, e))
    }
}

impl Ledger for CsvLedger {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_all(&self) -> Result<Vec<Row>> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_rows("read_all")
    }

    fn append_row(&self, row: &[String]) -> Result<()> {
        self.append_rows(&[row.to_vec()])
    }

    fn append_rows(&self, rows: &[Row]) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::store("append_rows", format!("{}: {e}", self.path.display())))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| Error::store("append_rows", e))?;
        }
        writer.flush().map_err(|e| Error::store("append_rows", e))
    }

    fn delete_row(&self, index: usize) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows = self.read_rows("delete_row")?;
        if index == 0 || index > rows.len() {
            return Err(Error::store(
                "delete_row",
                format!("row {index} out of range (1..={})", rows.len()),
            ));
        }
        rows.remove(index - 1);
        self.write_rows("delete_row", &rows)
    }

    fn rewrite(&self, rows: &[Row]) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_rows("rewrite", rows)
    }
}

/// A directory of CSV worksheets.
#[derive(Debug)]
pub struct CsvWorkbook {
    root: PathBuf,
    sheets: Mutex<Vec<Arc<CsvLedger>>>,
}

impl CsvWorkbook {
    /// Opens a workbook directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| Error::store("open_workbook", format!("{}: {e}", root.display())))?;
        Ok(Self {
            root,
            sheets: Mutex::new(Vec::new()),
        })
    }

    /// Returns the workbook directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sheet_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::InvalidInput(format!("invalid worksheet name '{name}'")));
        }
        Ok(self.root.join(format!("{name}.csv")))
    }

    fn cached(&self, name: &str) -> Arc<CsvLedger> {
        let mut sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = sheets.iter().find(|s| s.name == name) {
            return Arc::clone(existing);
        }
        let ledger = Arc::new(CsvLedger::new(name, self.root.join(format!("{name}.csv"))));
        sheets.push(Arc::clone(&ledger));
        ledger
    }
}

impl Workbook for CsvWorkbook {
    fn worksheet(&self, name: &str) -> Result<Option<Arc<dyn Ledger>>> {
        let path = self.sheet_path(name)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(self.cached(name) as Arc<dyn Ledger>))
    }

    fn add_worksheet(&self, name: &str, header: &[String]) -> Result<Arc<dyn Ledger>> {
        let path = self.sheet_path(name)?;
        let ledger = self.cached(name);
        {
            let _guard = ledger
                .write_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !path.exists() {
                ledger.write_rows("add_worksheet", &[header.to_vec()])?;
                tracing::info!(worksheet = name, path = %path.display(), "Created worksheet");
            }
        }
        Ok(ledger as Arc<dyn Ledger>)
    }
}
