//! Comparable keys derived from requests and stored records.

use super::normalizer::{email_domain, normalize_email, normalize_phone, normalize_text, salted_hash};
use crate::config::{HashSalt, PiiMode};
use crate::models::{ContactPii, ContactRecord, LockRequest};

/// Keys one matching pass compares on.
///
/// Derived fresh on every pass and never persisted. An empty key never
/// matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedKeySet {
    /// Case and space folded company name.
    pub company: String,
    /// Normalized email, or its salted digest in hashed mode.
    pub email: String,
    /// Digits-only phone, or its salted digest in hashed mode.
    pub phone: String,
    /// Email domain. Always empty in hashed mode.
    pub domain: String,
}

impl NormalizedKeySet {
    /// Returns true if every key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.company.is_empty()
            && self.email.is_empty()
            && self.phone.is_empty()
            && self.domain.is_empty()
    }
}

/// Derives keys and persisted PII under one mode and salt.
///
/// Requests and records must go through the same deriver so their keys are
/// comparable.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    mode: PiiMode,
    salt: HashSalt,
}

impl KeyDeriver {
    /// Creates a deriver.
    #[must_use]
    pub const fn new(mode: PiiMode, salt: HashSalt) -> Self {
        Self { mode, salt }
    }

    /// Returns the PII mode.
    #[must_use]
    pub const fn mode(&self) -> PiiMode {
        self.mode
    }

    fn email_key(&self, email: &str) -> String {
        let normalized = normalize_email(email);
        match self.mode {
            PiiMode::Hashed => salted_hash(self.salt.expose(), &normalized),
            PiiMode::Raw => normalized,
        }
    }

    fn phone_key(&self, phone: &str) -> String {
        let normalized = normalize_phone(phone);
        match self.mode {
            PiiMode::Hashed => salted_hash(self.salt.expose(), &normalized),
            PiiMode::Raw => normalized,
        }
    }

    fn domain_key(&self, email: &str) -> String {
        match self.mode {
            PiiMode::Hashed => String::new(),
            PiiMode::Raw => email_domain(email),
        }
    }

    /// Derives keys for a submitted request.
    #[must_use]
    pub fn for_request(&self, request: &LockRequest) -> NormalizedKeySet {
        NormalizedKeySet {
            company: normalize_text(&request.company),
            email: self.email_key(&request.email),
            phone: self.phone_key(&request.phone),
            domain: self.domain_key(&request.email),
        }
    }

    /// Derives keys for a stored record.
    ///
    /// Raw records are hashed on the fly in hashed mode, so legacy rows stay
    /// comparable. Hashed records carry no domain.
    #[must_use]
    pub fn for_record(&self, record: &ContactRecord) -> NormalizedKeySet {
        let company = normalize_text(&record.company);
        match &record.pii {
            ContactPii::Raw { email, phone } => NormalizedKeySet {
                company,
                email: self.email_key(email),
                phone: self.phone_key(phone),
                domain: self.domain_key(email),
            },
            ContactPii::Hashed {
                email_hash,
                phone_hash,
            } => NormalizedKeySet {
                company,
                email: email_hash.trim().to_lowercase(),
                phone: phone_hash.trim().to_lowercase(),
                domain: String::new(),
            },
        }
    }

    /// Builds the PII to persist for a request.
    ///
    /// In hashed mode the raw values are dropped here and never reach the
    /// ledger.
    #[must_use]
    pub fn persisted_pii(&self, request: &LockRequest) -> ContactPii {
        match self.mode {
            PiiMode::Hashed => ContactPii::Hashed {
                email_hash: self.email_key(&request.email),
                phone_hash: self.phone_key(&request.phone),
            },
            PiiMode::Raw => ContactPii::Raw {
                email: request.email.trim().to_string(),
                phone: request.phone.trim().to_string(),
            },
        }
    }

    /// Converts PII to its hashed form, for archiving legacy rows.
    #[must_use]
    pub fn hash_pii(&self, pii: &ContactPii) -> ContactPii {
        match pii {
            ContactPii::Raw { email, phone } => ContactPii::Hashed {
                email_hash: salted_hash(self.salt.expose(), &normalize_email(email)),
                phone_hash: salted_hash(self.salt.expose(), &normalize_phone(phone)),
            },
            hashed @ ContactPii::Hashed { .. } => hashed.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LockRequest {
        LockRequest::new(" Acme  Search ", "Jane", "Pure Search", "Sam")
            .with_email(" Jane@Acme.com ")
            .with_phone("+44 20 1234")
    }

    fn hashed() -> KeyDeriver {
        KeyDeriver::new(PiiMode::Hashed, HashSalt::from_option(Some("pepper".into())))
    }

    #[test]
    fn test_raw_keys() {
        let keys = KeyDeriver::new(PiiMode::Raw, HashSalt::Fallback).for_request(&request());
        assert_eq!(keys.company, "acme search");
        assert_eq!(keys.email, "jane@acme.com");
        assert_eq!(keys.phone, "44201234");
        assert_eq!(keys.domain, "acme.com");
    }

    #[test]
    fn test_hashed_keys_drop_domain() {
        let keys = hashed().for_request(&request());
        assert_eq!(keys.email.len(), 64);
        assert_eq!(keys.phone.len(), 64);
        assert!(keys.domain.is_empty());
    }

    #[test]
    fn test_empty_channel_has_empty_key() {
        let req = LockRequest::new("Acme", "Jane", "Other", "Sam").with_phone("020");
        let keys = hashed().for_request(&req);
        assert!(keys.email.is_empty());
        assert!(!keys.phone.is_empty());
    }

    #[test]
    fn test_persisted_record_keys_match_request_keys() {
        let deriver = hashed();
        let req = request();
        let record = ContactRecord {
            timestamp: None,
            date: None,
            company: req.company.trim().to_string(),
            contact_name: req.contact_name.clone(),
            brand: None,
            locked_by: req.locked_by.clone(),
            notes: String::new(),
            pii: deriver.persisted_pii(&req),
        };
        assert_eq!(deriver.for_record(&record), deriver.for_request(&req));
    }

    #[test]
    fn test_legacy_raw_record_is_comparable_in_hashed_mode() {
        let deriver = hashed();
        let req = request();
        let record = ContactRecord {
            timestamp: None,
            date: None,
            company: "Acme Search".into(),
            contact_name: "Jane".into(),
            brand: None,
            locked_by: "Sam".into(),
            notes: String::new(),
            pii: ContactPii::Raw {
                email: "jane@acme.com".into(),
                phone: "44 20 1234".into(),
            },
        };
        assert_eq!(deriver.for_record(&record), deriver.for_request(&req));
        assert_eq!(deriver.hash_pii(&record.pii), deriver.persisted_pii(&req));
    }
}
