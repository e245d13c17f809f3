//! Ledger column layouts and row encoding.

use crate::config::PiiMode;
use crate::models::temporal::{format_date, format_timestamp, parse_date, parse_timestamp};
use crate::models::{Brand, ContactPii, ContactRecord};
use crate::storage::traits::Row;
use crate::{Error, Result};

/// Name of the live worksheet.
pub const LOCKS_SHEET: &str = "Locks";

/// Name of the archive worksheet.
pub const ARCHIVE_SHEET: &str = "Archive";

/// Columns shared by both layouts.
pub const BASE_COLUMNS: [&str; 7] = [
    "Timestamp",
    "Date",
    "Company",
    "Contact Name",
    "Brand",
    "Locked By",
    "Notes",
];

/// Raw-PII layout.
pub const RAW_COLUMNS: [&str; 9] = [
    "Timestamp",
    "Date",
    "Company",
    "Contact Name",
    "Email",
    "Phone",
    "Brand",
    "Locked By",
    "Notes",
];

/// Privacy-hardened layout.
pub const HASHED_COLUMNS: [&str; 9] = [
    "Timestamp",
    "Date",
    "Company",
    "Contact Name",
    "Brand",
    "Locked By",
    "Notes",
    "EmailHash",
    "PhoneHash",
];

/// Ledger layout generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Raw email and phone columns.
    Raw,
    /// Email and phone digests only.
    Hashed,
}

impl SchemaVersion {
    /// Returns the layout used for a PII mode.
    #[must_use]
    pub const fn for_mode(mode: PiiMode) -> Self {
        match mode {
            PiiMode::Raw => Self::Raw,
            PiiMode::Hashed => Self::Hashed,
        }
    }

    /// Returns the ordered column names.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Raw => &RAW_COLUMNS,
            Self::Hashed => &HASHED_COLUMNS,
        }
    }

    /// Returns the header row.
    #[must_use]
    pub fn header(self) -> Row {
        self.columns().iter().map(|c| (*c).to_string()).collect()
    }

    /// Returns the layout whose header equals `header` exactly (cells trimmed).
    #[must_use]
    pub fn detect(header: &[String]) -> Option<Self> {
        [Self::Hashed, Self::Raw].into_iter().find(|version| {
            let columns = version.columns();
            header.len() == columns.len()
                && header.iter().zip(columns).all(|(h, c)| h.trim() == *c)
        })
    }

    /// Encodes a record as a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the record's PII form does not fit
    /// this layout.
    pub fn encode(self, record: &ContactRecord) -> Result<Row> {
        let timestamp = record.timestamp.as_ref().map(format_timestamp).unwrap_or_default();
        let date = record.date.as_ref().map(format_date).unwrap_or_default();
        match (self, &record.pii) {
            (Self::Raw, ContactPii::Raw { email, phone }) => Ok(vec![
                timestamp,
                date,
                record.company.clone(),
                record.contact_name.clone(),
                email.clone(),
                phone.clone(),
                record.brand_label().to_string(),
                record.locked_by.clone(),
                record.notes.clone(),
            ]),
            (
                Self::Hashed,
                ContactPii::Hashed {
                    email_hash,
                    phone_hash,
                },
            ) => Ok(vec![
                timestamp,
                date,
                record.company.clone(),
                record.contact_name.clone(),
                record.brand_label().to_string(),
                record.locked_by.clone(),
                record.notes.clone(),
                email_hash.clone(),
                phone_hash.clone(),
            ]),
            _ => Err(Error::InvalidInput(format!(
                "record PII does not fit the {self:?} layout"
            ))),
        }
    }

    /// Decodes a data row.
    ///
    /// Short rows are padded with empty cells; extra cells are ignored.
    #[must_use]
    pub fn decode(self, row: &[String]) -> ContactRecord {
        let cell = |i: usize| row.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
        let (brand_at, pii) = match self {
            Self::Raw => (
                6,
                ContactPii::Raw {
                    email: cell(4),
                    phone: cell(5),
                },
            ),
            Self::Hashed => (
                4,
                ContactPii::Hashed {
                    email_hash: cell(7),
                    phone_hash: cell(8),
                },
            ),
        };
        let timestamp = parse_timestamp(&cell(0));
        ContactRecord {
            timestamp,
            date: parse_date(&cell(1)).or_else(|| timestamp.map(|ts| ts.date())),
            company: cell(2),
            contact_name: cell(3),
            brand: Brand::parse(&cell(brand_at)),
            locked_by: cell(brand_at + 1),
            notes: cell(brand_at + 2),
            pii,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(pii: ContactPii) -> ContactRecord {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap();
        ContactRecord {
            timestamp: Some(ts),
            date: Some(ts.date()),
            company: "Acme, Ltd".into(),
            contact_name: "Jane".into(),
            brand: Some(Brand::CatalystPartners),
            locked_by: "Sam".into(),
            notes: "call after 3".into(),
            pii,
        }
    }

    #[test]
    fn test_detect() {
        assert_eq!(
            SchemaVersion::detect(&SchemaVersion::Hashed.header()),
            Some(SchemaVersion::Hashed)
        );
        assert_eq!(
            SchemaVersion::detect(&SchemaVersion::Raw.header()),
            Some(SchemaVersion::Raw)
        );
        let mut header = SchemaVersion::Hashed.header();
        header.push("Owner".into());
        assert_eq!(SchemaVersion::detect(&header), None);
    }

    #[test]
    fn test_hashed_row_layout() {
        let rec = record(ContactPii::Hashed {
            email_hash: "e".into(),
            phone_hash: "p".into(),
        });
        let row = SchemaVersion::Hashed.encode(&rec).unwrap();
        assert_eq!(row[0], "2024-01-01 09:30:00");
        assert_eq!(row[4], "Catalyst Partners");
        assert_eq!(row[7], "e");
        assert_eq!(SchemaVersion::Hashed.decode(&row), rec);
    }

    #[test]
    fn test_raw_row_layout() {
        let rec = record(ContactPii::Raw {
            email: "jane@acme.com".into(),
            phone: "0201".into(),
        });
        let row = SchemaVersion::Raw.encode(&rec).unwrap();
        assert_eq!(row[4], "jane@acme.com");
        assert_eq!(SchemaVersion::Raw.decode(&row), rec);
    }

    #[test]
    fn test_mismatched_pii_is_rejected() {
        let rec = record(ContactPii::Raw {
            email: String::new(),
            phone: String::new(),
        });
        assert!(SchemaVersion::Hashed.encode(&rec).is_err());
    }

    #[test]
    fn test_short_row_is_padded() {
        let row: Row = vec!["garbage".into(), String::new(), "Acme".into()];
        let rec = SchemaVersion::Hashed.decode(&row);
        assert_eq!(rec.timestamp, None);
        assert_eq!(rec.company, "Acme");
        assert_eq!(rec.brand, None);
    }
}
