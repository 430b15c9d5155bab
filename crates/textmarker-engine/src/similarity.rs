//! Edit-distance similarity over normalized text.
//!
//! Used by the restorer's fuzzy fallback when an exact, context-validated
//! match cannot be found.

use crate::normalize::normalize_default;

/// Similarity of `a` and `b` in `[0, 1]`.
///
/// Both inputs are normalized first; equal normalized forms (including two
/// empty strings) score 1. Otherwise the score is
/// `1 - levenshtein(a, b) / max(len(a), len(b))` over chars, so every
/// additional edit lowers (or keeps) the score.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_default(a);
    let b = normalize_default(b);
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    let distance = levenshtein(&a, &b);

    1.0 - distance as f64 / max_len as f64
}

/// Unit-cost insert/delete/substitute edit distance, two-row DP.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Keep the inner loop over the shorter string.
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitute = prev[j] + usize::from(lc != sc);
            let delete = prev[j + 1] + 1;
            let insert = curr[j] + 1;
            curr[j + 1] = substitute.min(delete).min(insert);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}
