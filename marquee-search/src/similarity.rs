//! String similarity: Gestalt pattern ratio and edit distance.
//!
//! Both measures run on [`normalize`]d text, so case, accents and spacing
//! never count as differences.

use crate::normalize::normalize;

/// Threshold used by [`fuzzy_match`] when callers have no better value.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Similarity ratio in `[0, 1]` based on shared contiguous blocks.
///
/// Computes `2·M / (|a| + |b|)` where `M` counts characters in the longest
/// common block plus, recursively, the blocks to its left and right
/// (Ratcliff/Obershelp). Rewards shared substrings over strict alignment, so
/// `"Movie: Part Two"` and `"Movie Part Two"` score close to 1.
///
/// Returns `0.0` when either input normalizes to empty. Symmetric.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_ratio(&normalize(a), &normalize(b))
}

/// Levenshtein distance between the normalized forms of `a` and `b`.
///
/// Insertions, deletions and substitutions each cost 1, counted per char.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(&normalize(a), &normalize(b))
}

/// `similarity(query, target) >= threshold`.
pub fn fuzzy_match(query: &str, target: &str, threshold: f64) -> bool {
    similarity(query, target) >= threshold
}

/// Ratio for inputs that are already normalized.
pub(crate) fn normalized_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Block search breaks ties by position, which depends on operand order.
    // Scoring in a canonical order keeps the ratio symmetric.
    let (left, right) = if a <= b { (a, b) } else { (b, a) };
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();

    let matched = matched_chars(&left, &right);
    (2 * matched) as f64 / (left.len() + right.len()) as f64
}

/// Total size of the recursively found matching blocks.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(a, b)];

    while let Some((a, b)) = pending.pop() {
        if a.is_empty() || b.is_empty() {
            continue;
        }
        let (i, j, len) = longest_common_block(a, b);
        if len == 0 {
            continue;
        }
        total += len;
        pending.push((&a[..i], &b[..j]));
        pending.push((&a[i + len..], &b[j + len..]));
    }

    total
}

/// Longest common substring as `(start_in_a, start_in_b, len)`.
///
/// The first maximal block found in row-major order wins.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let run = curr[j + 1];
            if run > best.2 {
                best = (i + 1 - run, j + 1 - run, run);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}
