//! Text rendering shared by the command handlers.

use lockout::models::temporal::format_timestamp;
use lockout::{ContactPii, DuplicateHitSet, StoredRecord};
use std::fmt::Write;

/// Width hashes are shortened to in listings.
const HASH_PREVIEW: usize = 10;

fn short_hash(hash: &str) -> String {
    if hash.is_empty() {
        "-".to_string()
    } else {
        format!("{}…", hash.chars().take(HASH_PREVIEW).collect::<String>())
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

/// Renders one record as a single line.
pub fn record_line(stored: &StoredRecord) -> String {
    let record = &stored.record;
    let when = record
        .timestamp
        .as_ref()
        .map_or_else(|| "(no timestamp)".to_string(), format_timestamp);
    let contact = match &record.pii {
        ContactPii::Raw { email, phone } => format!("{} / {}", or_dash(email), or_dash(phone)),
        ContactPii::Hashed {
            email_hash,
            phone_hash,
        } => format!("#{} / #{}", short_hash(email_hash), short_hash(phone_hash)),
    };
    format!(
        "{when}  {company} | {name} | {contact} | {brand} | locked by {by}",
        company = or_dash(&record.company),
        name = or_dash(&record.contact_name),
        brand = or_dash(record.brand_label()),
        by = or_dash(&record.locked_by),
    )
}

/// Renders duplicate hits grouped by signal.
pub fn hit_report(hits: &DuplicateHitSet) -> String {
    let mut out = String::new();
    for group in hits.groups() {
        let _ = writeln!(out, "{} ({}):", group.signal, group.records.len());
        for stored in &group.records {
            let _ = writeln!(out, "  row {:>4}  {}", stored.row, record_line(stored));
        }
    }
    let _ = writeln!(out, "{} possible duplicate(s) in total.", hits.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockout::ContactRecord;
    use lockout::services::deduplication::{HitGroup, MatchSignal};

    fn stored(pii: ContactPii) -> StoredRecord {
        StoredRecord {
            row: 2,
            record: ContactRecord {
                timestamp: None,
                date: None,
                company: "Acme".to_string(),
                contact_name: "Jane".to_string(),
                brand: None,
                locked_by: "Sam".to_string(),
                notes: String::new(),
                pii,
            },
        }
    }

    #[test]
    fn test_hashed_record_line_shortens_digests() {
        let line = record_line(&stored(ContactPii::Hashed {
            email_hash: "a".repeat(64),
            phone_hash: String::new(),
        }));
        assert!(line.contains("#aaaaaaaaaa… / #-"));
        assert!(line.contains("(no timestamp)"));
    }

    #[test]
    fn test_hit_report_lists_groups() {
        let hits = DuplicateHitSet::from_groups(vec![HitGroup {
            signal: MatchSignal::ExactEmail,
            records: vec![stored(ContactPii::Raw {
                email: "jane@acme.com".to_string(),
                phone: String::new(),
            })],
        }]);
        let report = hit_report(&hits);
        assert!(report.starts_with("Exact email (1):"));
        assert!(report.contains("jane@acme.com / -"));
        assert!(report.ends_with("1 possible duplicate(s) in total.\n"));
    }
}
