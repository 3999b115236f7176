//! Text canonicalization for title comparison.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Folds case, accents and whitespace so equivalent titles compare equal.
///
/// Compatibility-decomposes (NFKD), lowercases, drops combining marks,
/// spells out letters that have no decomposition (`ß`, `æ`, `ø`, ...),
/// then collapses whitespace runs to a single space and trims.
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());

    // Lowercasing can itself emit combining marks ('İ' -> "i\u{307}"),
    // so decompose again before filtering.
    let chars = text.nfkd().flat_map(char::to_lowercase).nfkd();
    for c in chars.filter(|c| !is_combining_mark(*c)) {
        match c {
            'ß' => folded.push_str("ss"),
            'æ' => folded.push_str("ae"),
            'œ' => folded.push_str("oe"),
            'þ' => folded.push_str("th"),
            'ø' => folded.push('o'),
            'ł' => folded.push('l'),
            'đ' | 'ð' => folded.push('d'),
            c => folded.push(c),
        }
    }

    let mut collapsed = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }
    collapsed
}
