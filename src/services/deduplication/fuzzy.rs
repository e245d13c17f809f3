//! Token-set similarity for company names.
//!
//! Names are split on whitespace and compared as token sets, so word order
//! and repeated words do not affect the score. Strings are compared with the
//! indel ratio: `2 * lcs / (len_a + len_b)`, scaled to 0..=100, where `lcs`
//! is the longest common subsequence in characters.

use std::collections::BTreeSet;

fn tokens(s: &str) -> BTreeSet<String> {
    s.split_whitespace().map(str::to_lowercase).collect()
}

fn join(parts: &[&String]) -> String {
    parts
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Length of the longest common subsequence, in characters.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0_usize; b.len() + 1];
    let mut cur = vec![0_usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Indel similarity of two strings, 0 to 100. Two empty strings score 100.
#[allow(clippy::cast_precision_loss)]
fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    (2 * lcs_len(&a, &b)) as f64 / total as f64 * 100.0
}

/// Scores two company names from 0 to 100.
///
/// The shared tokens are compared against each side's full token set, and
/// the two full sets are compared with each other; the best of the three
/// scores wins. When one side's tokens are a subset of the other's, the
/// score is 100.
///
/// # Example
///
/// ```rust
/// use lockout::services::deduplication::token_set_ratio;
///
/// assert!((token_set_ratio("Acme Search Partners", "partners acme search") - 100.0).abs() < f64::EPSILON);
/// assert!(token_set_ratio("Acme", "Globex") < 50.0);
/// ```
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let left = tokens(a);
    let right = tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared: Vec<&String> = left.intersection(&right).collect();
    let only_left: Vec<&String> = left.difference(&right).collect();
    let only_right: Vec<&String> = right.difference(&left).collect();

    if !shared.is_empty() && (only_left.is_empty() || only_right.is_empty()) {
        return 100.0;
    }

    let full = indel_ratio(
        &join(&[shared.as_slice(), only_left.as_slice()].concat()),
        &join(&[shared.as_slice(), only_right.as_slice()].concat()),
    );
    if shared.is_empty() {
        return full;
    }

    let base = join(&shared);
    full.max(indel_ratio(
        &base,
        &join(&[shared.as_slice(), only_left.as_slice()].concat()),
    ))
    .max(indel_ratio(
        &base,
        &join(&[shared.as_slice(), only_right.as_slice()].concat()),
    ))
}
