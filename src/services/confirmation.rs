//! Confirm-to-override protocol.
//!
//! A submission that matches existing records is blocked once. Resubmitting
//! the identical contact (same email, phone, and company keys) confirms the
//! override and lets the write through. Any change to those keys re-arms the
//! gate with the new signature, so a confirmation cannot be carried over to
//! different contact details.
//!
//! ```text
//!            hits, new signature
//!   +-------+ ----------------------> +--------------+
//!   | Clear |                         | Armed(sig)   | --+ hits, other sig:
//!   +-------+ <---------------------- +--------------+ <-+ re-arm, block
//!       ^      write succeeded /           |
//!       |      no hits                     | hits, same sig: proceed
//!       +----------------------------------+
//! ```
//!
//! There is no timeout: a stale `Armed` state persists until superseded.

use crate::services::deduplication::NormalizedKeySet;
use uuid::Uuid;

/// Identity of a submission for confirmation purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    email: String,
    phone: String,
    company: String,
}

impl Signature {
    /// Builds the signature from a candidate's keys.
    #[must_use]
    pub fn from_keys(keys: &NormalizedKeySet) -> Self {
        Self {
            email: keys.email.clone(),
            phone: keys.phone.clone(),
            company: keys.company.clone(),
        }
    }
}

/// Gate state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GateState {
    /// No pending confirmation.
    #[default]
    Clear,
    /// Waiting for an identical resubmission.
    Armed(Signature),
}

/// What the gate decided for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No duplicates; write.
    Proceed,
    /// Duplicates, but this is the identical resubmission; write.
    Confirmed,
    /// Duplicates; block and show them.
    NeedsConfirmation,
}

impl GateDecision {
    /// Returns true if the submission may be written.
    #[must_use]
    pub const fn allows_write(self) -> bool {
        matches!(self, Self::Proceed | Self::Confirmed)
    }
}

/// Per-session two-state confirmation machine.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationGate {
    state: GateState,
}

impl ConfirmationGate {
    /// Creates a gate in the `Clear` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> &GateState {
        &self.state
    }

    /// Returns true if a confirmation is pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        matches!(self.state, GateState::Armed(_))
    }

    /// Decides whether a submission may be written.
    ///
    /// A clean submission always proceeds and clears any pending
    /// confirmation. A confirmed submission leaves the gate armed until
    /// [`Self::on_write_succeeded`], so a failed write can be retried
    /// without another warning.
    pub fn evaluate(&mut self, signature: Signature, has_hits: bool) -> GateDecision {
        if !has_hits {
            self.state = GateState::Clear;
            return GateDecision::Proceed;
        }
        match &self.state {
            GateState::Armed(pending) if *pending == signature => GateDecision::Confirmed,
            _ => {
                self.state = GateState::Armed(signature);
                GateDecision::NeedsConfirmation
            },
        }
    }

    /// Records a successful write.
    pub fn on_write_succeeded(&mut self) {
        self.state = GateState::Clear;
    }
}

/// One submitter's working context.
///
/// Owned by the caller and passed explicitly to each submission; nothing
/// about a session is stored globally.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    pub(crate) gate: ConfirmationGate,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a session with a fresh id and a clear gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            gate: ConfirmationGate::new(),
        }
    }

    /// Returns the session id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the confirmation gate.
    #[must_use]
    pub const fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }
}
