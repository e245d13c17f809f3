//! Today-view filters and entries.

use super::{Brand, StoredRecord};
use serde::Serialize;

/// Filter criteria for the today view.
///
/// All criteria are optional and combine with AND logic. Blank strings are
/// treated as absent.
#[derive(Debug, Clone, Default)]
pub struct TodayFilter {
    /// Substring of the normalized company name.
    pub company: Option<String>,
    /// Substring of the email (raw stores) or contact name; exact email in hashed stores.
    pub email: Option<String>,
    /// Substring of the digits-only phone (raw stores); exact phone in hashed stores.
    pub phone: Option<String>,
    /// Brand set membership; empty means any brand.
    pub brands: Vec<Brand>,
}

impl TodayFilter {
    /// Creates an empty filter (matches all).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            company: None,
            email: None,
            phone: None,
            brands: Vec::new(),
        }
    }

    /// Filters by company substring.
    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Filters by email or contact name.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Filters by phone.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Adds a brand to the allowed set.
    #[must_use]
    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brands.push(brand);
        self
    }
}

/// One row of the today view.
#[derive(Debug, Clone, Serialize)]
pub struct TodayEntry {
    /// The record and its row position.
    pub stored: StoredRecord,
    /// True if an earlier record the same day shares an email, phone, or company key.
    pub dup_today: bool,
}
