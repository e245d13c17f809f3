//! Duplicate-detection configuration.

use std::fmt;

/// Minimum score, 0-100, a company pair needs to count as a fuzzy match.
///
/// Always within `[MIN, MAX]`.
///
/// # Example
///
/// ```rust
/// use lockout::services::deduplication::FuzzyThreshold;
///
/// assert_eq!(FuzzyThreshold::default().value(), 82);
/// assert_eq!(FuzzyThreshold::clamped(99).value(), 95);
/// assert!(FuzzyThreshold::new(60).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FuzzyThreshold(u8);

impl FuzzyThreshold {
    /// Lowest accepted threshold.
    pub const MIN: u8 = 70;
    /// Highest accepted threshold.
    pub const MAX: u8 = 95;
    /// Default threshold.
    pub const DEFAULT: u8 = 82;

    /// Creates a threshold, rejecting values outside `[MIN, MAX]`.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Creates a threshold, clamping out-of-range values with a warning.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        if clamped != value {
            tracing::warn!(
                requested = value,
                applied = clamped,
                "Fuzzy threshold out of range, clamping"
            );
        }
        // In range [70, 95] after clamping.
        Self(u8::try_from(clamped).unwrap_or(Self::DEFAULT))
    }

    /// Returns the threshold value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl Default for FuzzyThreshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for FuzzyThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
