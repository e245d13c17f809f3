//! Ledger schema migrations.
//!
//! Runs once per store open. A ledger whose header already matches the
//! target layout is left untouched, so repeated runs are no-ops.
//!
//! Columns are matched by header name, not position, so legacy sheets with
//! reordered columns still migrate. Unknown or missing columns abort the
//! migration with [`Error::SchemaDrift`] and leave the ledger as it was.

use super::schema::{BASE_COLUMNS, SchemaVersion};
use super::traits::{Ledger, Row};
use crate::models::ContactPii;
use crate::services::deduplication::KeyDeriver;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::instrument;

/// A schema generation.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: u32,
    /// Human-readable description.
    pub description: &'static str,
}

/// Known schema generations, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Raw Email and Phone columns",
    },
    Migration {
        version: 2,
        description: "Replace Email and Phone with salted EmailHash and PhoneHash",
    },
];

/// What [`ensure_schema`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Header already matched.
    Current,
    /// The ledger was empty; a header was written.
    Initialized,
    /// Rows were restructured into the target layout.
    Migrated {
        /// Data rows carried over.
        rows: usize,
    },
}

const EMAIL: &str = "Email";
const PHONE: &str = "Phone";
const EMAIL_HASH: &str = "EmailHash";
const PHONE_HASH: &str = "PhoneHash";
const KNOWN_EXTRA: [&str; 4] = [EMAIL, PHONE, EMAIL_HASH, PHONE_HASH];

/// Brings a ledger to the `target` layout and returns its rows afterwards.
///
/// # Errors
///
/// Returns [`Error::StoreUnavailable`] if the ledger cannot be read or
/// written, or [`Error::SchemaDrift`] if the header cannot be reconciled.
#[instrument(skip(ledger, deriver), fields(operation = "ensure_schema", worksheet = ledger.name()))]
pub fn ensure_schema(
    ledger: &dyn Ledger,
    target: SchemaVersion,
    deriver: &KeyDeriver,
) -> Result<(MigrationOutcome, Vec<Row>)> {
    let rows = ledger.read_all()?;

    let Some(header) = rows.first().filter(|h| !is_blank(h)) else {
        if rows.iter().any(|r| !is_blank(r)) {
            return Err(drift(ledger.name(), "missing header row above data"));
        }
        let header = target.header();
        if rows.is_empty() {
            ledger.append_row(&header)?;
        } else {
            ledger.rewrite(&[header.clone()])?;
        }
        tracing::info!("Initialized empty worksheet header");
        return Ok((MigrationOutcome::Initialized, vec![header]));
    };

    if SchemaVersion::detect(header) == Some(target) {
        return Ok((MigrationOutcome::Current, rows));
    }

    let migrated = migrate_rows(ledger.name(), &rows, target, deriver)?;
    let carried = migrated.len() - 1;
    ledger.rewrite(&migrated)?;

    metrics::counter!("lockout_migrations_total", "worksheet" => ledger.name().to_string())
        .increment(1);
    tracing::info!(
        rows = carried,
        target = ?target,
        "Migrated worksheet to current schema"
    );
    Ok((MigrationOutcome::Migrated { rows: carried }, migrated))
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn drift(worksheet: &str, reason: impl Into<String>) -> Error {
    Error::SchemaDrift {
        worksheet: worksheet.to_string(),
        reason: reason.into(),
    }
}

fn migrate_rows(
    worksheet: &str,
    rows: &[Row],
    target: SchemaVersion,
    deriver: &KeyDeriver,
) -> Result<Vec<Row>> {
    let (header, data) = rows.split_first().ok_or_else(|| drift(worksheet, "no header row"))?;

    let mut columns: HashMap<&str, usize> = HashMap::new();
    for (i, name) in header.iter().enumerate() {
        let name = name.trim();
        if name.is_empty() {
            if data.iter().any(|r| r.get(i).is_some_and(|c| !c.trim().is_empty())) {
                return Err(drift(worksheet, format!("unnamed column {} holds data", i + 1)));
            }
            continue;
        }
        if !BASE_COLUMNS.contains(&name) && !KNOWN_EXTRA.contains(&name) {
            return Err(drift(worksheet, format!("unknown column '{name}'")));
        }
        if columns.insert(name, i).is_some() {
            return Err(drift(worksheet, format!("duplicate column '{name}'")));
        }
    }
    for required in BASE_COLUMNS {
        if !columns.contains_key(required) {
            return Err(drift(worksheet, format!("missing column '{required}'")));
        }
    }

    let has = |name: &str| columns.contains_key(name);
    match target {
        SchemaVersion::Hashed => {
            if !(has(EMAIL) || has(EMAIL_HASH)) || !(has(PHONE) || has(PHONE_HASH)) {
                return Err(drift(worksheet, "no email or phone column to migrate"));
            }
        },
        SchemaVersion::Raw => {
            if !(has(EMAIL) && has(PHONE)) {
                return Err(drift(
                    worksheet,
                    "raw email/phone cannot be restored from digests",
                ));
            }
        },
    }

    let mut out = Vec::with_capacity(data.len() + 1);
    out.push(target.header());
    for row in data {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let cell = |name: &str| {
            columns
                .get(name)
                .and_then(|&i| row.get(i))
                .map(|c| c.trim().to_string())
                .unwrap_or_default()
        };
        let mut migrated: Row = BASE_COLUMNS.iter().map(|c| cell(c)).collect();
        match target {
            SchemaVersion::Hashed => {
                let (email_hash, phone_hash) = match deriver.hash_pii(&ContactPii::Raw {
                    email: cell(EMAIL),
                    phone: cell(PHONE),
                }) {
                    ContactPii::Hashed {
                        email_hash,
                        phone_hash,
                    } => (email_hash, phone_hash),
                    ContactPii::Raw { .. } => (String::new(), String::new()),
                };
                let keep = |existing: String, derived: String| {
                    if existing.is_empty() { derived } else { existing }
                };
                migrated.push(keep(cell(EMAIL_HASH), email_hash));
                migrated.push(keep(cell(PHONE_HASH), phone_hash));
            },
            SchemaVersion::Raw => {
                migrated.insert(4, cell(EMAIL));
                migrated.insert(5, cell(PHONE));
            },
        }
        out.push(migrated);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HashSalt, PiiMode};
    use crate::storage::ledger::MemoryLedger;

    fn deriver() -> KeyDeriver {
        KeyDeriver::new(PiiMode::Hashed, HashSalt::from_option(Some("pepper".into())))
    }

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    fn legacy_rows() -> Vec<Row> {
        vec![
            SchemaVersion::Raw.header(),
            row(&[
                "2024-01-01 09:00:00",
                "2024-01-01",
                "Acme",
                "Jane",
                "Jane@Acme.com",
                "+44 20 1234",
                "Pure Search",
                "Sam",
                "",
            ]),
        ]
    }

    #[test]
    fn test_versions_are_sequential() {
        for (i, m) in MIGRATIONS.iter().enumerate() {
            assert_eq!(m.version as usize, i + 1);
        }
    }

    #[test]
    fn test_empty_ledger_gets_header() {
        let ledger = MemoryLedger::new("Locks", vec![]);
        let (outcome, rows) = ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap();
        assert_eq!(outcome, MigrationOutcome::Initialized);
        assert_eq!(rows, vec![SchemaVersion::Hashed.header()]);
        assert_eq!(ledger.rows(), rows);
    }

    #[test]
    fn test_blank_sheet_gets_header() {
        let ledger = MemoryLedger::new("Locks", vec![row(&["", " "]), row(&[""])]);
        let (outcome, rows) = ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap();
        assert_eq!(outcome, MigrationOutcome::Initialized);
        assert_eq!(ledger.rows(), rows);
    }

    #[test]
    fn test_blank_header_above_data_is_drift() {
        let before = vec![row(&["", ""]), row(&["2024-01-01", "Precious"])];
        let ledger = MemoryLedger::new("Locks", before.clone());
        let err = ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap_err();
        assert!(matches!(err, Error::SchemaDrift { .. }));
        assert!(err.to_string().contains("missing header"));
        assert_eq!(ledger.rows(), before);
    }

    #[test]
    fn test_current_header_is_untouched() {
        let ledger = MemoryLedger::new("Locks", vec![SchemaVersion::Hashed.header()]);
        let (outcome, _) = ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap();
        assert_eq!(outcome, MigrationOutcome::Current);
    }

    #[test]
    fn test_legacy_raw_is_hashed_and_idempotent() {
        let ledger = MemoryLedger::new("Locks", legacy_rows());
        let (outcome, rows) = ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap();
        assert_eq!(outcome, MigrationOutcome::Migrated { rows: 1 });
        assert_eq!(rows[0], SchemaVersion::Hashed.header());

        let record = SchemaVersion::Hashed.decode(&rows[1]);
        assert_eq!(record.company, "Acme");
        assert_eq!(record.locked_by, "Sam");
        match record.pii {
            ContactPii::Hashed {
                email_hash,
                phone_hash,
            } => {
                assert_eq!(email_hash.len(), 64);
                assert_eq!(phone_hash.len(), 64);
            },
            ContactPii::Raw { .. } => panic!("raw PII survived migration"),
        }
        assert!(!ledger.rows().concat().iter().any(|c| c.contains("Acme.com")));

        let (again, rows_again) =
            ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap();
        assert_eq!(again, MigrationOutcome::Current);
        assert_eq!(rows_again, rows);
    }

    #[test]
    fn test_reordered_columns_are_mapped_by_name() {
        let ledger = MemoryLedger::new(
            "Locks",
            vec![
                row(&[
                    "Company",
                    "Timestamp",
                    "Date",
                    "Contact Name",
                    "Brand",
                    "Locked By",
                    "Notes",
                    "Phone",
                    "Email",
                ]),
                row(&["Acme", "", "", "Jane", "Other", "Sam", "n", "", "a@x.com"]),
            ],
        );
        let (_, rows) = ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap();
        assert_eq!(rows[1][2], "Acme");
        assert_eq!(rows[1][8], "");
        assert_eq!(rows[1][7].len(), 64);
    }

    #[test]
    fn test_unknown_column_is_drift() {
        let mut rows = legacy_rows();
        rows[0].push("Owner".into());
        let ledger = MemoryLedger::new("Locks", rows.clone());
        let err = ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap_err();
        assert!(matches!(err, Error::SchemaDrift { .. }));
        assert_eq!(ledger.rows(), rows);
    }

    #[test]
    fn test_missing_column_is_drift() {
        let mut rows = legacy_rows();
        rows[0].retain(|c| c != "Notes");
        let ledger = MemoryLedger::new("Locks", rows);
        let err = ensure_schema(&ledger, SchemaVersion::Hashed, &deriver()).unwrap_err();
        assert!(err.to_string().contains("missing column 'Notes'"));
    }

    #[test]
    fn test_hashed_to_raw_is_refused() {
        let ledger = MemoryLedger::new("Locks", vec![SchemaVersion::Hashed.header()]);
        let err = ensure_schema(&ledger, SchemaVersion::Raw, &deriver()).unwrap_err();
        assert!(matches!(err, Error::SchemaDrift { .. }));
    }
}
