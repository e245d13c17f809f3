//! CSV directory store: persistence across opens and legacy migration.

// Integration tests use expect/unwrap for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use chrono::{TimeZone, Utc};
use lockout::config::LockoutConfig;
use lockout::models::FixedClock;
use lockout::services::deduplication::{normalize_email, salted_hash};
use lockout::storage::{LOCKS_SHEET, MigrationOutcome, SchemaVersion, open_workbook};
use lockout::{LockRequest, LockService, Session, SubmitOutcome, TodayFilter};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const SALT: &str = "csv-salt";

fn config(dir: &TempDir) -> LockoutConfig {
    LockoutConfig::new()
        .with_store(dir.path().display().to_string())
        .with_hash_salt(SALT)
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 6, 3, 8, 15, 0).unwrap()))
}

fn read_csv(dir: &TempDir, sheet: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(dir.path().join(format!("{sheet}.csv")))
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let request = LockRequest::new("Acme, Ltd", "Jane \"JD\" Doe", "Catalyst Partners", "Sam")
        .with_email("jane@acme.com")
        .with_notes("line one\nline two");

    {
        let service = LockService::open(&config(&dir)).unwrap().with_clock(clock());
        let outcome = service.submit_lock(&mut Session::new(), &request).unwrap();
        assert!(matches!(outcome, SubmitOutcome::Accepted(_)));
    }

    let reopened = LockService::open(&config(&dir)).unwrap().with_clock(clock());
    let entries = reopened.list_today(&TodayFilter::new()).unwrap();
    assert_eq!(entries.len(), 1);
    let record = &entries[0].stored.record;
    assert_eq!(record.company, "Acme, Ltd");
    assert_eq!(record.contact_name, "Jane \"JD\" Doe");
    assert_eq!(record.notes, "line one\nline two");

    let hits = reopened
        .preview(&LockRequest::new("Other", "", "", "").with_email("JANE@acme.com"))
        .unwrap();
    assert!(hits.has_signal("exact_email"));
}

#[test]
fn test_legacy_raw_sheet_is_migrated_on_open() {
    let dir = TempDir::new().unwrap();
    let legacy = "Timestamp,Date,Company,Contact Name,Email,Phone,Brand,Locked By,Notes\n\
                  2024-01-02 09:00:00,2024-01-02,Acme,Jane,Jane@Acme.com,020 7946 0000,Pure Search,Sam,\n\
                  2024-01-02 10:00:00,2024-01-02,Globex,Bob,,0161 000 0000,Other,Alex,call back\n";
    fs::write(dir.path().join(format!("{LOCKS_SHEET}.csv")), legacy).unwrap();

    let config = config(&dir);
    let service = LockService::new(open_workbook(&config).unwrap(), &config);
    assert_eq!(
        service.migrate().unwrap(),
        MigrationOutcome::Migrated { rows: 2 }
    );
    assert_eq!(service.migrate().unwrap(), MigrationOutcome::Current);

    let rows = read_csv(&dir, LOCKS_SHEET);
    assert_eq!(rows[0], SchemaVersion::Hashed.header());
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][2], "Acme");
    assert_eq!(rows[1][7], salted_hash(SALT, &normalize_email("Jane@Acme.com")));
    assert_eq!(rows[2][6], "call back");
    assert!(rows[2][7].is_empty());
    for row in &rows {
        assert!(!row.iter().any(|c| c.contains("Acme.com") || c.contains("7946 0000")));
    }

    // Legacy contacts stay matchable after their raw columns are gone.
    let hits = service
        .preview(&LockRequest::new("Initech", "", "", "").with_phone("(020) 7946-0000"))
        .unwrap();
    assert!(hits.has_signal("exact_phone"));
}

#[test]
fn test_unknown_columns_refuse_writes() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(format!("{LOCKS_SHEET}.csv")),
        "Timestamp,Date,Company,Owner\n2024-01-02 09:00:00,2024-01-02,Acme,Sam\n",
    )
    .unwrap();

    let err = LockService::open(&config(&dir)).err().unwrap();
    assert!(matches!(err, lockout::Error::SchemaDrift { .. }));
    let untouched = fs::read_to_string(dir.path().join(format!("{LOCKS_SHEET}.csv"))).unwrap();
    assert!(untouched.contains("Owner"));
}
