//! PIN-gated archive and reset operations.
//!
//! Every operation checks the PIN before touching the store, then runs
//! under the same writer gate as lock submissions. Rows are deleted from the
//! highest index down so positions still to be deleted stay valid.
//!
//! Archiving always copies before it deletes. If the delete step fails the
//! rows stay live and also appear in the archive; they are never lost.

use super::lock::LockService;
use crate::models::{ContactRecord, StoredRecord};
use crate::storage::{ARCHIVE_SHEET, Ledger, Row, SchemaVersion, ensure_schema};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::fmt;
use tracing::instrument;

/// Which rows an archive run moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveScope {
    /// Rows dated the given day.
    Today(NaiveDate),
    /// Every data row.
    All,
}

impl ArchiveScope {
    fn selects(self, record: &ContactRecord) -> bool {
        match self {
            Self::Today(date) => record.date == Some(date),
            Self::All => true,
        }
    }

    /// Returns the sheet positions to delete. `All` covers every row below
    /// the header, blank padding rows included.
    fn positions(self, selected: &[StoredRecord], row_count: usize) -> Vec<usize> {
        match self {
            Self::Today(_) => selected.iter().map(|s| s.row).collect(),
            Self::All => (2..=row_count).collect(),
        }
    }
}

impl fmt::Display for ArchiveScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today(date) => write!(f, "day {date}"),
            Self::All => write!(f, "all rows"),
        }
    }
}

/// Admin handle borrowed from a [`LockService`].
pub struct AdminOps<'a> {
    service: &'a LockService,
}

impl<'a> AdminOps<'a> {
    pub(super) const fn new(service: &'a LockService) -> Self {
        Self { service }
    }

    /// Returns true if a PIN is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.service.authorizer.is_enabled()
    }

    /// Deletes every row dated `date`. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on a bad PIN (nothing is read), or a
    /// store error if a read or delete fails.
    #[instrument(skip(self, pin), fields(operation = "clear_today", date = %date))]
    pub fn clear_today(&self, pin: &str, date: NaiveDate) -> Result<usize> {
        self.service.authorizer.require("clear_today", pin)?;
        self.clear(ArchiveScope::Today(date), false, "clear_today")
    }

    /// Deletes every row below the header, blank ones included. Returns the
    /// number deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on a bad PIN (nothing is read), or a
    /// store error if a read or delete fails.
    #[instrument(skip(self, pin), fields(operation = "clear_all"))]
    pub fn clear_all(&self, pin: &str) -> Result<usize> {
        self.service.authorizer.require("clear_all", pin)?;
        self.clear(ArchiveScope::All, false, "clear_all")
    }

    /// Copies the selected rows to the archive worksheet, then deletes them.
    /// Returns the number of rows removed from the live sheet; blank padding
    /// rows under `All` are removed without being archived.
    ///
    /// The archive is created on first use and always holds digests, never
    /// raw email or phone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on a bad PIN (nothing is read). If
    /// the copy fails nothing is deleted; if a delete fails the remaining
    /// rows stay live and archived.
    #[instrument(skip(self, pin), fields(operation = "archive_and_clear", scope = %scope))]
    pub fn archive_and_clear(&self, pin: &str, scope: ArchiveScope) -> Result<usize> {
        self.service.authorizer.require("archive_and_clear", pin)?;
        self.clear(scope, true, "archive_and_clear")
    }

    fn clear(&self, scope: ArchiveScope, archive: bool, action: &'static str) -> Result<usize> {
        let service = self.service;
        let _permit = service.writer.acquire(action)?;
        let ledger = service.locks()?;
        let (_, rows) = ensure_schema(ledger.as_ref(), service.schema, &service.deriver)?;

        let selected: Vec<StoredRecord> = service
            .decode_rows(service.schema, &rows)
            .into_iter()
            .filter(|s| scope.selects(&s.record))
            .collect();
        let positions = scope.positions(&selected, rows.len());
        if positions.is_empty() {
            tracing::info!(action = action, "No rows selected");
            return Ok(0);
        }

        if archive && !selected.is_empty() {
            self.copy_to_archive(&selected)?;
        }

        let deleted = delete_descending(ledger.as_ref(), positions)?;
        metrics::counter!("lockout_admin_rows_total", "action" => action)
            .increment(u64::try_from(deleted).unwrap_or(u64::MAX));
        tracing::info!(action = action, rows = deleted, "Admin action complete");
        Ok(deleted)
    }

    fn copy_to_archive(&self, selected: &[StoredRecord]) -> Result<()> {
        let service = self.service;
        let target = SchemaVersion::Hashed;
        let batch = selected
            .iter()
            .map(|s| {
                let mut record = s.record.clone();
                record.pii = service.deriver.hash_pii(&record.pii);
                target.encode(&record)
            })
            .collect::<Result<Vec<Row>>>()?;

        let archive = service
            .workbook
            .worksheet_or_create(ARCHIVE_SHEET, &target.header())?;
        ensure_schema(archive.as_ref(), target, &service.deriver)?;
        archive.append_rows(&batch)?;
        tracing::info!(rows = batch.len(), "Copied rows to archive");
        Ok(())
    }
}

/// Deletes rows from the highest position down.
fn delete_descending(ledger: &dyn Ledger, mut positions: Vec<usize>) -> Result<usize> {
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();

    let total = positions.len();
    for (done, row) in positions.into_iter().enumerate() {
        if let Err(e) = ledger.delete_row(row) {
            tracing::error!(
                deleted = done,
                remaining = total - done,
                error = %e,
                "Delete failed part way"
            );
            return Err(Error::store(
                "delete_row",
                format!("deleted {done} of {total} rows before failure: {e}"),
            ));
        }
    }
    Ok(total)
}
