//! In-memory workbook.
//!
//! Used by tests and the `memory:` store location. Supports fault injection
//! so partial-failure paths can be exercised deterministically.

use crate::storage::traits::{Ledger, Row, Workbook};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    fail_appends: bool,
    deletes_before_failure: Option<usize>,
    delay: Option<Duration>,
    delete_delay: Option<Duration>,
}

/// A ledger held in memory.
#[derive(Debug)]
pub struct MemoryLedger {
    name: String,
    rows: Mutex<Vec<Row>>,
    faults: Mutex<Faults>,
}

impl MemoryLedger {
    /// Creates a ledger holding `rows`.
    #[must_use]
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows: Mutex::new(rows),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Returns a copy of the current rows.
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Makes every call fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults().unavailable = unavailable;
    }

    /// Makes appends fail until reset.
    pub fn fail_appends(&self, fail: bool) {
        self.faults().fail_appends = fail;
    }

    /// Allows `n` more deletes, then fails every later one.
    pub fn fail_deletes_after(&self, n: usize) {
        self.faults().deletes_before_failure = Some(n);
    }

    /// Delays every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.faults().delay = Some(delay);
    }

    /// Delays every delete by `delay`, on top of any call delay.
    pub fn set_delete_delay(&self, delay: Duration) {
        self.faults().delete_delay = Some(delay);
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        let (unavailable, delay) = {
            let faults = self.faults();
            (faults.unavailable, faults.delay)
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if unavailable {
            return Err(Error::store(operation, format!("worksheet '{}' unavailable", self.name)));
        }
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_all(&self) -> Result<Vec<Row>> {
        self.check("read_all")?;
        Ok(self.rows())
    }

    fn append_row(&self, row: &[String]) -> Result<()> {
        self.append_rows(&[row.to_vec()])
    }

    fn append_rows(&self, rows: &[Row]) -> Result<()> {
        self.check("append_rows")?;
        if self.faults().fail_appends {
            return Err(Error::store("append_rows", "injected append failure"));
        }
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(rows.iter().cloned());
        Ok(())
    }

    fn delete_row(&self, index: usize) -> Result<()> {
        self.check("delete_row")?;
        let delete_delay = self.faults().delete_delay;
        if let Some(delay) = delete_delay {
            std::thread::sleep(delay);
        }
        {
            let mut faults = self.faults();
            if let Some(remaining) = faults.deletes_before_failure.as_mut() {
                if *remaining == 0 {
                    return Err(Error::store("delete_row", "injected delete failure"));
                }
                *remaining -= 1;
            }
        }
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        if index == 0 || index > rows.len() {
            return Err(Error::store(
                "delete_row",
                format!("row {index} out of range (1..={})", rows.len()),
            ));
        }
        rows.remove(index - 1);
        Ok(())
    }

    fn rewrite(&self, rows: &[Row]) -> Result<()> {
        self.check("rewrite")?;
        *self.rows.lock().unwrap_or_else(PoisonError::into_inner) = rows.to_vec();
        Ok(())
    }
}

/// A workbook held in memory.
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: Mutex<BTreeMap<String, Arc<MemoryLedger>>>,
    unavailable: AtomicBool,
}

impl MemoryWorkbook {
    /// Creates an empty workbook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a worksheet pre-populated with `rows` (header first).
    #[must_use]
    pub fn with_sheet(self, name: &str, rows: Vec<Row>) -> Self {
        self.sheets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(MemoryLedger::new(name, rows)));
        self
    }

    /// Returns the concrete ledger for inspection and fault injection.
    #[must_use]
    pub fn ledger(&self, name: &str) -> Option<Arc<MemoryLedger>> {
        self.sheets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Makes worksheet lookups fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::store(operation, "workbook unavailable"));
        }
        Ok(())
    }
}

impl Workbook for MemoryWorkbook {
    fn worksheet(&self, name: &str) -> Result<Option<Arc<dyn Ledger>>> {
        self.check("worksheet")?;
        Ok(self
            .ledger(name)
            .map(|ledger| ledger as Arc<dyn Ledger>))
    }

    fn add_worksheet(&self, name: &str, header: &[String]) -> Result<Arc<dyn Ledger>> {
        self.check("add_worksheet")?;
        let mut sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        let ledger = sheets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryLedger::new(name, vec![header.to_vec()])));
        Ok(Arc::clone(ledger) as Arc<dyn Ledger>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn test_delete_shifts_rows() {
        let ledger = MemoryLedger::new(
            "Locks",
            vec![row(&["H"]), row(&["a"]), row(&["b"]), row(&["c"])],
        );
        ledger.delete_row(2).unwrap();
        assert_eq!(ledger.rows(), vec![row(&["H"]), row(&["b"]), row(&["c"])]);
    }

    #[test]
    fn test_delete_out_of_range() {
        let ledger = MemoryLedger::new("Locks", vec![row(&["H"])]);
        assert!(ledger.delete_row(0).is_err());
        assert!(ledger.delete_row(2).is_err());
    }

    #[test]
    fn test_fail_deletes_after() {
        let ledger = MemoryLedger::new(
            "Locks",
            vec![row(&["H"]), row(&["a"]), row(&["b"])],
        );
        ledger.fail_deletes_after(1);
        assert!(ledger.delete_row(3).is_ok());
        assert!(ledger.delete_row(2).is_err());
        assert_eq!(ledger.rows().len(), 2);
    }

    #[test]
    fn test_unavailable() {
        let ledger = MemoryLedger::new("Locks", vec![]);
        ledger.set_unavailable(true);
        assert!(matches!(
            ledger.read_all(),
            Err(Error::StoreUnavailable { .. })
        ));
    }

    #[test]
    fn test_add_worksheet_is_idempotent() {
        let workbook = MemoryWorkbook::new();
        assert!(workbook.worksheet("Archive").unwrap().is_none());
        let header = row(&["H"]);
        workbook.add_worksheet("Archive", &header).unwrap();
        workbook.add_worksheet("Archive", &header).unwrap();
        assert_eq!(workbook.ledger("Archive").unwrap().rows(), vec![header]);
    }
}
