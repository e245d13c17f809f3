//! Duplicate detection for lock requests.
//!
//! Normalizes raw input into comparable keys and checks them against every
//! existing record:
//! 1. **Exact email**: equal normalized email or salted digest
//! 2. **Exact phone**: equal digits-only phone or salted digest
//! 3. **Email domain**: equal domain (raw-PII stores only)
//! 4. **Fuzzy company**: token-set similarity against each distinct company
//!
//! Unlike a short-circuit check, every signal runs and contributes its own
//! labelled group, so a reviewer sees why each record was flagged.
//!
//! # Example
//!
//! ```rust,ignore
//! use lockout::services::deduplication::{KeyDeriver, Matcher};
//!
//! let deriver = KeyDeriver::new(config.pii_mode, config.hash_salt.clone());
//! let matcher = Matcher::new(config.fuzzy_threshold, config.capabilities);
//!
//! let hits = matcher.find_duplicates(&deriver.for_request(&request), &snapshot);
//! for group in hits.groups() {
//!     println!("{}: {} record(s)", group.signal, group.records.len());
//! }
//! ```

mod config;
#[cfg(feature = "fuzzy")]
mod fuzzy;
mod keys;
mod matcher;
mod normalizer;
mod types;

pub use config::FuzzyThreshold;
#[cfg(feature = "fuzzy")]
pub use fuzzy::token_set_ratio;
pub use keys::{KeyDeriver, NormalizedKeySet};
pub use matcher::{IndexedRecord, Matcher};
pub use normalizer::{email_domain, normalize_email, normalize_phone, normalize_text, salted_hash};
pub use types::{DuplicateHitSet, HitGroup, MatchSignal};
