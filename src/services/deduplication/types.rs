//! Duplicate detection result types.

use crate::models::StoredRecord;
use serde::Serialize;
use std::fmt;

/// A signal that can flag an existing record as a possible duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum MatchSignal {
    /// Same normalized email (or email digest).
    ExactEmail,
    /// Same digits-only phone (or phone digest).
    ExactPhone,
    /// Same email domain. Raw-PII stores only.
    EmailDomain {
        /// The shared domain.
        domain: String,
    },
    /// Company names scored at or above the threshold.
    FuzzyCompany {
        /// Threshold the pass ran with.
        threshold: u8,
    },
}

impl MatchSignal {
    /// Returns a short identifier for logs and metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExactEmail => "exact_email",
            Self::ExactPhone => "exact_phone",
            Self::EmailDomain { .. } => "email_domain",
            Self::FuzzyCompany { .. } => "fuzzy_company",
        }
    }

    /// Returns the label shown above a hit group.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::ExactEmail => "Exact email".to_string(),
            Self::ExactPhone => "Exact phone".to_string(),
            Self::EmailDomain { domain } => format!("Same email domain @{domain}"),
            Self::FuzzyCompany { threshold } => format!("Fuzzy company ≥{threshold}"),
        }
    }
}

impl fmt::Display for MatchSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Records flagged by one signal, in ledger order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitGroup {
    /// The signal that fired.
    pub signal: MatchSignal,
    /// Records it flagged. Never empty.
    pub records: Vec<StoredRecord>,
}

/// Result of one matching pass.
///
/// Groups appear in signal order: exact email, exact phone, email domain,
/// fuzzy company. The combined view holds every flagged record once, most
/// recent first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DuplicateHitSet {
    groups: Vec<HitGroup>,
    combined: Vec<StoredRecord>,
}

impl DuplicateHitSet {
    /// Creates an empty hit set (clear to proceed).
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            groups: Vec::new(),
            combined: Vec::new(),
        }
    }

    /// Builds a hit set from groups, deriving the combined view.
    ///
    /// Records are deduplicated by row and sorted by timestamp descending;
    /// records without a timestamp sort last, ties break on the later row.
    #[must_use]
    pub fn from_groups(groups: Vec<HitGroup>) -> Self {
        let mut combined: Vec<StoredRecord> = Vec::new();
        for group in &groups {
            for stored in &group.records {
                if !combined.iter().any(|c| c.row == stored.row) {
                    combined.push(stored.clone());
                }
            }
        }
        combined.sort_by(|a, b| {
            b.record
                .timestamp
                .cmp(&a.record.timestamp)
                .then_with(|| b.row.cmp(&a.row))
        });
        Self { groups, combined }
    }

    /// Returns the hit groups.
    #[must_use]
    pub fn groups(&self) -> &[HitGroup] {
        &self.groups
    }

    /// Returns the deduplicated, most-recent-first view.
    #[must_use]
    pub fn combined(&self) -> &[StoredRecord] {
        &self.combined
    }

    /// Returns the number of distinct flagged records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combined.len()
    }

    /// Returns true if no signal fired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns true if the given signal fired.
    #[must_use]
    pub fn has_signal(&self, id: &str) -> bool {
        self.groups.iter().any(|g| g.signal.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactPii, ContactRecord};
    use chrono::NaiveDate;

    fn stored(row: usize, hour: Option<u32>) -> StoredRecord {
        StoredRecord {
            row,
            record: ContactRecord {
                timestamp: hour.and_then(|h| {
                    NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(h, 0, 0))
                }),
                date: NaiveDate::from_ymd_opt(2024, 1, 1),
                company: format!("Company {row}"),
                contact_name: String::new(),
                brand: None,
                locked_by: String::new(),
                notes: String::new(),
                pii: ContactPii::Hashed {
                    email_hash: String::new(),
                    phone_hash: String::new(),
                },
            },
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(MatchSignal::ExactEmail.label(), "Exact email");
        assert_eq!(
            MatchSignal::EmailDomain {
                domain: "acme.com".into()
            }
            .label(),
            "Same email domain @acme.com"
        );
        assert_eq!(
            MatchSignal::FuzzyCompany { threshold: 82 }.label(),
            "Fuzzy company ≥82"
        );
    }

    #[test]
    fn test_combined_is_deduplicated_and_recent_first() {
        let hits = DuplicateHitSet::from_groups(vec![
            HitGroup {
                signal: MatchSignal::ExactEmail,
                records: vec![stored(2, Some(9)), stored(4, Some(11))],
            },
            HitGroup {
                signal: MatchSignal::ExactPhone,
                records: vec![stored(4, Some(11)), stored(3, None), stored(5, Some(10))],
            },
        ]);

        let rows: Vec<usize> = hits.combined().iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![4, 5, 2, 3]);
        assert_eq!(hits.len(), 4);
        assert!(hits.has_signal("exact_phone"));
        assert!(!hits.has_signal("fuzzy_company"));
    }

    #[test]
    fn test_empty() {
        let hits = DuplicateHitSet::empty();
        assert!(hits.is_empty());
        assert!(hits.combined().is_empty());
    }
}
