//! Brand types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The brand a lock is taken on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Brand {
    /// Dartmouth Partners.
    #[serde(rename = "Dartmouth Partners")]
    DartmouthPartners,
    /// Catalyst Partners.
    #[serde(rename = "Catalyst Partners")]
    CatalystPartners,
    /// Pure Search.
    #[serde(rename = "Pure Search")]
    PureSearch,
    /// Any other brand.
    Other,
}

impl Brand {
    /// Returns all brand variants, in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DartmouthPartners,
            Self::CatalystPartners,
            Self::PureSearch,
            Self::Other,
        ]
    }

    /// Returns the brand as it is written to the ledger.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DartmouthPartners => "Dartmouth Partners",
            Self::CatalystPartners => "Catalyst Partners",
            Self::PureSearch => "Pure Search",
            Self::Other => "Other",
        }
    }

    /// Parses a brand from its ledger text or a kebab/snake-case alias.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let folded: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c })
            .collect();
        match folded.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "dartmouth partners" | "dartmouth" => Some(Self::DartmouthPartners),
            "catalyst partners" | "catalyst" => Some(Self::CatalystPartners),
            "pure search" | "pure" => Some(Self::PureSearch),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Dartmouth Partners", Brand::DartmouthPartners)]
    #[test_case("catalyst-partners", Brand::CatalystPartners)]
    #[test_case("  PURE   search ", Brand::PureSearch)]
    #[test_case("pure_search", Brand::PureSearch)]
    #[test_case("other", Brand::Other)]
    fn test_parse_aliases(input: &str, expected: Brand) {
        assert_eq!(Brand::parse(input), Some(expected));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Brand::parse("Acme Recruiting"), None);
        assert_eq!(Brand::parse(""), None);
    }

    #[test]
    fn test_as_str_roundtrips() {
        for brand in Brand::all() {
            assert_eq!(Brand::parse(brand.as_str()), Some(*brand));
        }
    }
}
