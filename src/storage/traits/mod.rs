//! Storage traits.

mod ledger;

pub use ledger::{Ledger, Row, Workbook};
