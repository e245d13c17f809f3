//! # Lockout
//!
//! Claim a business contact before you dial it.
//!
//! Lockout keeps a shared ledger of contact "locks" and warns a submitter,
//! before anything is written, when the contact (or a closely related one)
//! has already been claimed by someone else.
//!
//! ## Features
//!
//! - Multi-signal duplicate detection (exact email, exact phone, email domain,
//!   token-set fuzzy company match)
//! - Two-step confirm-to-override workflow per session
//! - Salted SHA-256 digests in place of raw email/phone
//! - PIN-gated archive and reset actions
//! - Pluggable ledgers (in-memory, CSV directory) behind a narrow trait
//!
//! ## Example
//!
//! ```rust,ignore
//! use lockout::{LockRequest, LockService, Session, SubmitOutcome};
//!
//! let service = LockService::open(workbook, settings)?;
//! let mut session = Session::new();
//! match service.submit_lock(&mut session, &request)? {
//!     SubmitOutcome::Accepted(record) => println!("locked {}", record.company),
//!     SubmitOutcome::Blocked(hits) => println!("{} possible duplicates", hits.len()),
//!     SubmitOutcome::Rejected(reason) => println!("{reason}"),
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{Capabilities, HashSalt, LockoutConfig, PiiMode};
pub use models::{
    Brand, ContactPii, ContactRecord, LockRequest, StoreTimezone, StoredRecord, TodayEntry,
    TodayFilter, ValidationError,
};
pub use services::{
    AdminOps, ArchiveScope, ConfirmationGate, DuplicateHitSet, LockService, Session,
    SubmitOutcome,
};
pub use storage::{Ledger, Workbook};

/// Error type for lockout operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Validation` | A required field is missing, or neither email nor phone was given |
/// | `InvalidInput` | Malformed configuration values or command arguments |
/// | `StoreUnavailable` | Ledger unreachable, credentials missing, call timed out |
/// | `SchemaDrift` | Ledger header does not match and migration could not fix it |
/// | `Unauthorized` | Admin action without a matching PIN |
/// | `OperationFailed` | Local I/O failures outside the ledger (logging, config files) |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A submission failed validation.
    ///
    /// No ledger access is attempted before this is returned.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store could not be reached.
    ///
    /// Raised when:
    /// - The credential bundle is missing or unreadable
    /// - A ledger call failed or exceeded its timeout
    /// - The circuit breaker is open after repeated failures
    /// - The writer gate could not be acquired in time
    ///
    /// Never retried automatically; retrying a failed append could duplicate it.
    #[error("store unavailable during '{operation}': {cause}")]
    StoreUnavailable {
        /// The ledger operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The ledger schema is not what this version expects.
    ///
    /// Writes are refused while this persists.
    #[error("schema drift in worksheet '{worksheet}': {reason}")]
    SchemaDrift {
        /// Worksheet whose header did not match.
        worksheet: String,
        /// Why migration could not reconcile it.
        reason: String,
    },

    /// An admin action was attempted without authorization.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A local operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::StoreUnavailable`] from any displayable cause.
    pub fn store(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns true when retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

/// Result type alias for lockout operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("bad threshold".to_string());
        assert_eq!(err.to_string(), "invalid input: bad threshold");

        let err = Error::store("append_row", "connection reset");
        assert_eq!(
            err.to_string(),
            "store unavailable during 'append_row': connection reset"
        );

        let err = Error::SchemaDrift {
            worksheet: "Locks".to_string(),
            reason: "unknown column 'Owner'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "schema drift in worksheet 'Locks': unknown column 'Owner'"
        );

        let err = Error::from(ValidationError::NoContactChannel);
        assert_eq!(
            err.to_string(),
            "validation failed: provide at least an email or a phone number"
        );
    }

    #[test]
    fn test_only_store_errors_are_retryable() {
        assert!(Error::store("read_all", "timeout").is_retryable());
        assert!(!Error::Unauthorized("no pin".to_string()).is_retryable());
        assert!(!Error::from(ValidationError::MissingField("company")).is_retryable());
    }
}
