//! Persisted lock records.

use super::Brand;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Email and phone as they are persisted.
///
/// A record holds either the raw values (legacy stores) or their salted
/// digests, never both for the same field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContactPii {
    /// Raw values as typed by the submitter (trimmed).
    Raw {
        /// Email address, possibly empty.
        email: String,
        /// Phone number, possibly empty.
        phone: String,
    },
    /// Salted SHA-256 digests of the normalized values.
    Hashed {
        /// Digest of the normalized email, empty when no email was given.
        email_hash: String,
        /// Digest of the digits-only phone, empty when no phone was given.
        phone_hash: String,
    },
}

impl ContactPii {
    /// Returns true if the raw values are held.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::Raw { .. })
    }
}

/// A persisted claim on a contact.
///
/// Records are immutable once appended; the ledger only ever appends them
/// or removes whole rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Creation time on the store-local clock. `None` if the cell is unparseable.
    pub timestamp: Option<NaiveDateTime>,
    /// Calendar day of `timestamp` in the configured timezone.
    pub date: Option<NaiveDate>,
    /// Company name.
    pub company: String,
    /// Contact name.
    pub contact_name: String,
    /// Brand the lock was taken for. `None` for unrecognised legacy values.
    pub brand: Option<Brand>,
    /// Name of the person who took the lock.
    pub locked_by: String,
    /// Free-text notes.
    pub notes: String,
    /// Email and phone, raw or hashed.
    pub pii: ContactPii,
}

impl ContactRecord {
    /// Returns the brand label used for display and filtering.
    #[must_use]
    pub fn brand_label(&self) -> &str {
        self.brand.as_ref().map_or("", Brand::as_str)
    }
}

/// A record read back from a ledger together with its row position.
///
/// The 1-based row (the header is row 1) identifies the record within one
/// snapshot; positions shift after deletes, so it must not be kept across
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// 1-based row position in the snapshot it was read from.
    pub row: usize,
    /// The record.
    pub record: ContactRecord,
}
