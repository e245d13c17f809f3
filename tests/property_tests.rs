//! Property-based tests for normalization, matching, and the ledger round trip.

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use lockout::config::{Capabilities, HashSalt, PiiMode};
use lockout::models::{ContactPii, ContactRecord};
use lockout::services::deduplication::{
    FuzzyThreshold, IndexedRecord, KeyDeriver, Matcher, NormalizedKeySet, normalize_phone,
    normalize_text, salted_hash,
};
use lockout::services::Signature;
use lockout::storage::SchemaVersion;
use lockout::{Brand, ConfirmationGate, StoredRecord};
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = ContactRecord> {
    (
        "[A-Za-z][A-Za-z ]{0,20}",
        "[A-Za-z ]{0,20}",
        "([a-f0-9]{64})?",
        "([a-f0-9]{64})?",
        prop::sample::select(Brand::all().to_vec()),
        "[A-Za-z]{1,10}",
        "[A-Za-z0-9 .,]{0,30}",
        0u32..24,
        0u32..60,
    )
        .prop_map(
            |(company, contact, email_hash, phone_hash, brand, by, notes, h, m)| {
                let timestamp = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
                    .and_then(|d| d.and_hms_opt(h, m, 0));
                ContactRecord {
                    timestamp,
                    date: timestamp.map(|t| t.date()),
                    company: company.trim().to_string(),
                    contact_name: contact.trim().to_string(),
                    brand: Some(brand),
                    locked_by: by,
                    notes: notes.trim().to_string(),
                    pii: ContactPii::Hashed {
                        email_hash,
                        phone_hash,
                    },
                }
            },
        )
}

proptest! {
    /// Property: text normalization is idempotent.
    #[test]
    fn prop_normalize_text_idempotent(s in "\\PC{0,40}") {
        let once = normalize_text(&s);
        prop_assert_eq!(normalize_text(&once), once);
    }

    /// Property: case and whitespace padding never change the text key.
    #[test]
    fn prop_normalize_text_ignores_case_and_padding(s in "[A-Za-z ]{0,30}", pad in " {0,5}") {
        let padded = format!("{pad}{}{pad}", s.to_uppercase());
        prop_assert_eq!(normalize_text(&padded), normalize_text(&s));
    }

    /// Property: phone normalization keeps only the digits, in order.
    #[test]
    fn prop_normalize_phone_formatting_insensitive(digits in "[0-9]{1,15}") {
        let formatted: String = digits
            .chars()
            .enumerate()
            .flat_map(|(i, c)| if i % 3 == 2 { vec![c, '-'] } else { vec![c, ' '] })
            .collect();
        let decorated = format!("+({formatted})");
        prop_assert_eq!(normalize_phone(&decorated), digits.clone());
        prop_assert_eq!(normalize_phone(&normalize_phone(&decorated)), digits);
    }

    /// Property: salted hashing is deterministic and separates distinct inputs.
    #[test]
    fn prop_salted_hash_deterministic(a in "[a-z0-9@.]{1,30}", b in "[a-z0-9@.]{1,30}") {
        prop_assert_eq!(salted_hash("salt", &a), salted_hash("salt", &a));
        if a != b {
            prop_assert_ne!(salted_hash("salt", &a), salted_hash("salt", &b));
        }
        prop_assert_ne!(salted_hash("salt", &a), salted_hash("other", &a));
    }

    /// Property: an all-empty candidate never matches anything.
    #[test]
    fn prop_empty_candidate_never_flags(records in prop::collection::vec(record_strategy(), 0..8)) {
        let deriver = KeyDeriver::new(PiiMode::Hashed, HashSalt::Fallback);
        let snapshot: Vec<IndexedRecord> = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| IndexedRecord {
                keys: deriver.for_record(&record),
                stored: StoredRecord { row: i + 2, record },
            })
            .collect();
        let matcher = Matcher::new(FuzzyThreshold::default(), Capabilities::resolve(true));
        prop_assert!(matcher.find_duplicates(&NormalizedKeySet::default(), &snapshot).is_empty());
    }

    /// Property: the gate confirms an identical resubmission and re-arms on any change.
    #[test]
    fn prop_gate_confirms_only_identical(email in "[a-z]{1,8}", other in "[a-z]{1,8}") {
        let keys = NormalizedKeySet { email: email.clone(), ..Default::default() };
        let changed = NormalizedKeySet { email: other.clone(), ..Default::default() };

        let mut gate = ConfirmationGate::new();
        prop_assert!(!gate.evaluate(Signature::from_keys(&keys), true).allows_write());
        let second = gate.evaluate(Signature::from_keys(&changed), true);
        prop_assert_eq!(second.allows_write(), email == other);
    }

    /// Property: encode then decode preserves every persisted field.
    #[test]
    fn prop_hashed_row_roundtrip(record in record_strategy()) {
        let row = SchemaVersion::Hashed.encode(&record).unwrap();
        prop_assert_eq!(SchemaVersion::Hashed.decode(&row), record);
    }
}
