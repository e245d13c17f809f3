//! Ledger and workbook traits.

use crate::Result;
use std::sync::Arc;

/// A row of cells, in column order.
pub type Row = Vec<String>;

/// Append-only, positionally addressed record store.
///
/// Row 1 is the header. Deleting row `i` shifts every later row up by one,
/// so multi-row deletes must run from the highest index down.
///
/// Calls are independent round trips with no mutual exclusion between
/// callers; read-then-write sequences are not atomic.
pub trait Ledger: Send + Sync {
    /// Returns the worksheet name.
    fn name(&self) -> &str;

    /// Reads every row, header included.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the store cannot be read.
    fn read_all(&self) -> Result<Vec<Row>>;

    /// Appends one row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the write fails.
    fn append_row(&self, row: &[String]) -> Result<()>;

    /// Appends several rows in one call.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the write fails.
    fn append_rows(&self, rows: &[Row]) -> Result<()> {
        for row in rows {
            self.append_row(row)?;
        }
        Ok(())
    }

    /// Deletes the row at a 1-based index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the index is out of
    /// range or the write fails.
    fn delete_row(&self, index: usize) -> Result<()>;

    /// Replaces every row, header included. Used by schema migration only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the write fails.
    fn rewrite(&self, rows: &[Row]) -> Result<()>;
}

/// A set of named ledgers sharing one store.
pub trait Workbook: Send + Sync {
    /// Opens a worksheet, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the store cannot be reached.
    fn worksheet(&self, name: &str) -> Result<Option<Arc<dyn Ledger>>>;

    /// Creates a worksheet with the given header row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the worksheet cannot be
    /// created.
    fn add_worksheet(&self, name: &str, header: &[String]) -> Result<Arc<dyn Ledger>>;

    /// Opens a worksheet, creating it with `header` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the store cannot be reached.
    fn worksheet_or_create(&self, name: &str, header: &[String]) -> Result<Arc<dyn Ledger>> {
        match self.worksheet(name)? {
            Some(ledger) => Ok(ledger),
            None => self.add_worksheet(name, header),
        }
    }
}
