//! Business logic services.
//!
//! [`LockService`] orchestrates the duplicate matcher, the per-session
//! [`ConfirmationGate`], and ledger writes. [`AdminOps`] shares its store and
//! writer gate for archive and reset actions.

mod admin;
mod auth;
mod confirmation;
pub mod deduplication;
mod lock;

pub use admin::{AdminOps, ArchiveScope};
pub use auth::AdminAuthorizer;
pub use confirmation::{ConfirmationGate, GateDecision, GateState, Session, Signature};
pub use deduplication::DuplicateHitSet;
pub use lock::{LockService, SubmitOutcome};
