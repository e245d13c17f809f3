//! Ledger implementations.

mod csv_dir;
mod memory;

pub use csv_dir::{CsvLedger, CsvWorkbook};
pub use memory::{MemoryLedger, MemoryWorkbook};
