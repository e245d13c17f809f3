//! Optional capabilities resolved once at startup.

/// Capabilities available to the matcher for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Token-set fuzzy company matching.
    pub fuzzy_matching: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::resolve(true)
    }
}

impl Capabilities {
    /// Creates capabilities with everything disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            fuzzy_matching: false,
        }
    }

    /// Returns true if fuzzy matching was compiled in.
    #[must_use]
    pub const fn fuzzy_compiled() -> bool {
        cfg!(feature = "fuzzy")
    }

    /// Resolves the requested capabilities against what was compiled in.
    ///
    /// Requesting fuzzy matching in a build without the `fuzzy` feature logs a
    /// warning and leaves it disabled; the matcher then skips that signal.
    #[must_use]
    pub fn resolve(fuzzy_requested: bool) -> Self {
        let compiled = Self::fuzzy_compiled();
        if fuzzy_requested && !compiled {
            tracing::warn!("Fuzzy company matching requested but not compiled in; skipping");
        }
        Self {
            fuzzy_matching: fuzzy_requested && compiled,
        }
    }
}
