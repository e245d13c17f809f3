//! Admin authorization.
//!
//! Admin actions are gated on a PIN checked at the service boundary, before
//! any ledger access. With no PIN configured every admin action is refused;
//! the gate never defaults open.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};

/// Checks admin PINs.
#[derive(Debug, Clone)]
pub struct AdminAuthorizer {
    pin: Option<SecretString>,
}

impl AdminAuthorizer {
    /// Creates an authorizer. `None` disables admin actions.
    #[must_use]
    pub const fn new(pin: Option<SecretString>) -> Self {
        Self { pin }
    }

    /// Returns true if a PIN is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.pin.is_some()
    }

    /// Verifies a supplied PIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if no PIN is configured or the PIN
    /// does not match.
    pub fn require(&self, action: &'static str, supplied: &str) -> Result<()> {
        let Some(expected) = self.pin.as_ref() else {
            tracing::warn!(action = action, "Admin action refused: no admin PIN configured");
            metrics::counter!("lockout_admin_auth_total", "result" => "disabled").increment(1);
            return Err(Error::Unauthorized(
                "admin actions are disabled: no admin PIN configured".to_string(),
            ));
        };

        if constant_time_eq(expected.expose_secret().as_bytes(), supplied.as_bytes()) {
            tracing::info!(action = action, "Admin action authorized");
            metrics::counter!("lockout_admin_auth_total", "result" => "granted").increment(1);
            Ok(())
        } else {
            tracing::warn!(action = action, "Admin action refused: PIN mismatch");
            metrics::counter!("lockout_admin_auth_total", "result" => "denied").increment(1);
            Err(Error::Unauthorized("admin PIN does not match".to_string()))
        }
    }
}

/// Compares two byte strings without short-circuiting on the first difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pin_refuses_everything() {
        let auth = AdminAuthorizer::new(None);
        assert!(!auth.is_enabled());
        assert!(matches!(
            auth.require("clear_all", ""),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_pin_match() {
        let auth = AdminAuthorizer::new(Some(SecretString::from("2468")));
        assert!(auth.require("clear_all", "2468").is_ok());
        assert!(auth.require("clear_all", "2469").is_err());
        assert!(auth.require("clear_all", "24680").is_err());
        assert!(auth.require("clear_all", "").is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
