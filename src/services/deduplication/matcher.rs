//! Multi-signal duplicate matcher.
//!
//! Evaluates each signal independently against a snapshot of existing
//! records:
//! 1. **Exact email**: equal email key or digest
//! 2. **Exact phone**: equal digits-only phone or digest
//! 3. **Email domain**: equal domain, raw-PII stores only
//! 4. **Fuzzy company**: token-set score at or above the threshold
//!
//! A signal whose candidate key is empty is skipped, so empty keys never
//! match each other.

use super::config::FuzzyThreshold;
use super::keys::NormalizedKeySet;
use super::types::{DuplicateHitSet, HitGroup, MatchSignal};
use crate::config::Capabilities;
use crate::models::StoredRecord;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::instrument;

/// A stored record with its keys precomputed for one pass.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    /// The record and its row.
    pub stored: StoredRecord,
    /// Keys derived from it.
    pub keys: NormalizedKeySet,
}

/// Finds existing records that may refer to the same contact.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    threshold: FuzzyThreshold,
    capabilities: Capabilities,
}

impl Matcher {
    /// Creates a matcher.
    #[must_use]
    pub const fn new(threshold: FuzzyThreshold, capabilities: Capabilities) -> Self {
        Self {
            threshold,
            capabilities,
        }
    }

    /// Returns the fuzzy threshold.
    #[must_use]
    pub const fn threshold(&self) -> FuzzyThreshold {
        self.threshold
    }

    /// Runs every available signal and collects the hits.
    #[allow(clippy::cast_precision_loss)]
    #[instrument(
        skip(self, candidate, existing),
        fields(operation = "match", snapshot_size = existing.len())
    )]
    pub fn find_duplicates(
        &self,
        candidate: &NormalizedKeySet,
        existing: &[IndexedRecord],
    ) -> DuplicateHitSet {
        let start = Instant::now();
        let mut groups = Vec::new();

        if !candidate.email.is_empty() {
            push_group(&mut groups, MatchSignal::ExactEmail, existing, |k| {
                k.email == candidate.email
            });
        }
        if !candidate.phone.is_empty() {
            push_group(&mut groups, MatchSignal::ExactPhone, existing, |k| {
                k.phone == candidate.phone
            });
        }
        if !candidate.domain.is_empty() {
            push_group(
                &mut groups,
                MatchSignal::EmailDomain {
                    domain: candidate.domain.clone(),
                },
                existing,
                |k| k.domain == candidate.domain,
            );
        }
        if self.capabilities.fuzzy_matching && !candidate.company.is_empty() {
            let qualifying = self.qualifying_companies(&candidate.company, existing);
            if !qualifying.is_empty() {
                push_group(
                    &mut groups,
                    MatchSignal::FuzzyCompany {
                        threshold: self.threshold.value(),
                    },
                    existing,
                    |k| qualifying.contains(k.company.as_str()),
                );
            }
        }

        for group in &groups {
            metrics::counter!(
                "lockout_duplicate_hits_total",
                "signal" => group.signal.as_str()
            )
            .increment(1);
        }
        let hits = DuplicateHitSet::from_groups(groups);
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("lockout_match_duration_ms").record(duration_ms);
        tracing::debug!(
            groups = hits.groups().len(),
            flagged = hits.len(),
            duration_ms = duration_ms,
            "Matching pass complete"
        );
        hits
    }

    /// Scores each distinct company key once and keeps those at or above
    /// the threshold.
    #[cfg(feature = "fuzzy")]
    fn qualifying_companies<'a>(
        &self,
        candidate: &str,
        existing: &'a [IndexedRecord],
    ) -> BTreeSet<&'a str> {
        let threshold = f64::from(self.threshold.value());
        existing
            .iter()
            .map(|r| r.keys.company.as_str())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|company| super::fuzzy::token_set_ratio(candidate, company) >= threshold)
            .collect()
    }

    #[cfg(not(feature = "fuzzy"))]
    fn qualifying_companies<'a>(
        &self,
        _candidate: &str,
        _existing: &'a [IndexedRecord],
    ) -> BTreeSet<&'a str> {
        BTreeSet::new()
    }
}

fn push_group<F>(
    groups: &mut Vec<HitGroup>,
    signal: MatchSignal,
    existing: &[IndexedRecord],
    matches: F,
) where
    F: Fn(&NormalizedKeySet) -> bool,
{
    let records: Vec<StoredRecord> = existing
        .iter()
        .filter(|r| matches(&r.keys))
        .map(|r| r.stored.clone())
        .collect();
    if !records.is_empty() {
        groups.push(HitGroup { signal, records });
    }
}
