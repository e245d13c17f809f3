//! Lock request and validation types.

use super::Brand;
use thiserror::Error;

/// Reasons a lock request is rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A mandatory field was empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// Neither email nor phone was supplied.
    #[error("provide at least an email or a phone number")]
    NoContactChannel,
    /// The brand is not one of the known brands.
    #[error("unknown brand '{0}'")]
    UnknownBrand(String),
}

/// Request to lock a contact, as typed by the submitter.
#[derive(Debug, Clone, Default)]
pub struct LockRequest {
    /// Company name (required).
    pub company: String,
    /// Contact name (required).
    pub contact_name: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: String,
    /// Brand text (required, must parse as a [`Brand`]).
    pub brand: String,
    /// Name of the submitter (required).
    pub locked_by: String,
    /// Optional notes.
    pub notes: String,
}

impl LockRequest {
    /// Creates a request with the mandatory fields.
    #[must_use]
    pub fn new(
        company: impl Into<String>,
        contact_name: impl Into<String>,
        brand: impl Into<String>,
        locked_by: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            contact_name: contact_name.into(),
            brand: brand.into(),
            locked_by: locked_by.into(),
            ..Default::default()
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets the phone.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Sets the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Checks mandatory fields and resolves the brand.
    ///
    /// Whitespace-only values count as missing.
    pub fn validate(&self) -> Result<Brand, ValidationError> {
        let required = [
            ("company", &self.company),
            ("contact name", &self.contact_name),
            ("brand", &self.brand),
            ("your name", &self.locked_by),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(name));
            }
        }

        if self.email.trim().is_empty() && self.phone.trim().is_empty() {
            return Err(ValidationError::NoContactChannel);
        }

        Brand::parse(&self.brand).ok_or_else(|| ValidationError::UnknownBrand(self.brand.clone()))
    }
}
