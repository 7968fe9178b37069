//! String normalization and fuzzy scoring.
//!
//! Scores are on a 0..=100 scale. [`token_set_score`] ignores word order and
//! repeated words, so "hall town" and "Town Hall" compare as identical.

use std::collections::BTreeSet;

/// Case-fold, turn punctuation into spaces and collapse whitespace runs.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Edit-distance similarity of two strings, 0..=100.
pub fn ratio(a: &str, b: &str) -> u8 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100;
    }
    let distance = levenshtein(a, b);
    let score = 100 * (longest - distance.min(longest)) / longest;
    score as u8
}

/// Word-set similarity of two already-normalized strings.
///
/// Splits both sides into word sets and compares the shared words against
/// each side's full sorted set, keeping the best pairing. A query whose words
/// are all contained in the candidate scores 100.
pub fn token_set_score(query: &str, candidate: &str) -> u8 {
    let left: BTreeSet<&str> = query.split_whitespace().collect();
    let right: BTreeSet<&str> = candidate.split_whitespace().collect();

    if left.is_empty() || right.is_empty() {
        return 0;
    }

    let shared = join_words(left.intersection(&right));
    let left_only = join_words(left.difference(&right));
    let right_only = join_words(right.difference(&left));

    let with_left = combine(&shared, &left_only);
    let with_right = combine(&shared, &right_only);

    let mut best = ratio(&with_left, &with_right);
    if !shared.is_empty() {
        best = best.max(ratio(&shared, &with_left)).max(ratio(&shared, &with_right));
    }
    best
}

fn join_words<'a>(words: impl Iterator<Item = &'a &'a str>) -> String {
    words.copied().collect::<Vec<_>>().join(" ")
}

fn combine(shared: &str, rest: &str) -> String {
    match (shared.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => shared.to_string(),
        (false, false) => format!("{} {}", shared, rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Town   Hall! "), "town hall");
        assert_eq!(normalize("St. John's-Church"), "st john s church");
        assert_eq!(normalize("ÉCOLE"), "école");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("library", "libary"), 1);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("park", "park"), 100);
        assert_eq!(ratio("", ""), 100);
        assert_eq!(ratio("abcd", "wxyz"), 0);
        assert_eq!(ratio("library", "libary"), 85);
    }

    #[test]
    fn test_token_set_score_ignores_order() {
        assert_eq!(token_set_score("hall town", "town hall"), 100);
        assert_eq!(token_set_score("town town hall", "town hall"), 100);
    }

    #[test]
    fn test_token_set_score_subset_is_full_match() {
        assert_eq!(token_set_score("clock tower", "other clock tower"), 100);
    }

    #[test]
    fn test_token_set_score_unrelated_is_low() {
        assert!(token_set_score("museum", "town hall") < 50);
        assert_eq!(token_set_score("", "town hall"), 0);
    }

    #[test]
    fn test_token_set_score_typo_is_high() {
        assert!(token_set_score("libary", "library") >= 80);
    }
}
