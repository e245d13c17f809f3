//! Storage layer.
//!
//! The core talks to the store only through the [`Ledger`] and
//! [`Workbook`] traits. Concrete workbooks:
//! - **Memory**: `memory:` locations, for tests and dry runs
//! - **CSV directory**: any other location, one `<worksheet>.csv` per sheet
//!
//! [`open_workbook`] wraps the chosen workbook with call timeouts, a circuit
//! breaker, and an in-flight tracker that keeps a timed-out mutation from
//! overlapping later calls.

// Allow significant_drop_tightening - guards are held for the whole ledger call.
#![allow(clippy::significant_drop_tightening)]

pub mod bulkhead;
pub mod ledger;
pub mod migrations;
pub mod resilience;
pub mod schema;
pub mod traits;

pub use bulkhead::{WriteGate, WritePermit, WriterGateConfig};
pub use ledger::{CsvLedger, CsvWorkbook, MemoryLedger, MemoryWorkbook};
pub use migrations::{MigrationOutcome, ensure_schema};
pub use resilience::{ResilientLedger, ResilientWorkbook, StorageResilienceConfig, StoreHealth};
pub use schema::{ARCHIVE_SHEET, LOCKS_SHEET, SchemaVersion};
pub use traits::{Ledger, Row, Workbook};

use crate::config::LockoutConfig;
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Location prefix selecting the in-memory workbook.
pub const MEMORY_LOCATION: &str = "memory:";

/// Opens the configured store, wrapped with timeouts and circuit breaking.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if no store is configured or the location
/// uses an unsupported transport, and [`Error::StoreUnavailable`] if the
/// credential bundle or the store itself cannot be opened.
pub fn open_workbook(config: &LockoutConfig) -> Result<Arc<dyn Workbook>> {
    let location = config.store_location()?.trim();
    if let Some(path) = config.store.credentials.as_deref() {
        check_credentials(path)?;
    }

    let inner: Arc<dyn Workbook> = if location.starts_with(MEMORY_LOCATION) {
        Arc::new(MemoryWorkbook::new())
    } else if location.starts_with("http://") || location.starts_with("https://") {
        return Err(Error::InvalidInput(format!(
            "unsupported store transport '{location}'; use a directory path"
        )));
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        Arc::new(CsvWorkbook::open(path)?)
    };

    tracing::debug!(location = location, "Opened workbook");
    Ok(Arc::new(ResilientWorkbook::labelled(
        inner,
        location,
        &config.resilience,
    )))
}

/// Verifies the credential bundle exists and is well-formed JSON.
///
/// # Errors
///
/// Returns [`Error::StoreUnavailable`] if the bundle is missing or malformed.
pub fn check_credentials(path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::store("load_credentials", format!("{}: {e}", path.display())))?;
    serde_json::from_str::<serde_json::Value>(&contents)
        .map_err(|e| Error::store("load_credentials", format!("{}: {e}", path.display())))?;
    Ok(())
}
