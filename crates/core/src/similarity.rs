//! Text similarity strategies used to compare a tentative book against catalog
//! records.
//!
//! Every strategy is a pure function of its two inputs, symmetric, and returns a
//! score in `[0, 1]` where `1.0` means the inputs are identical after
//! normalization. Strategies are interchangeable through [`SimilarityStrategy`],
//! so the resolution loop never depends on a concrete algorithm.

use strsim::normalized_levenshtein;

pub trait SimilarityStrategy: Send + Sync {
    fn score(&self, left: &str, right: &str) -> f64;
}

/// Normalized Levenshtein similarity, case and whitespace insensitive.
#[derive(Clone, Copy, Debug, Default)]
pub struct Levenshtein;

impl SimilarityStrategy for Levenshtein {
    fn score(&self, left: &str, right: &str) -> f64 {
        normalized_levenshtein(&normalize(left), &normalize(right))
    }
}

/// [`Levenshtein`] applied after removing parenthesized annotations such as
/// `(개정판)` or `(Special Edition)` from both inputs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LevenshteinWithoutParentheses;

impl SimilarityStrategy for LevenshteinWithoutParentheses {
    fn score(&self, left: &str, right: &str) -> f64 {
        Levenshtein.score(&strip_parenthesized(left), &strip_parenthesized(right))
    }
}

/// Lowercases and collapses every whitespace run into a single space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Removes every substring delimited by a matching pair of parentheses,
/// parentheses included. Nested pairs are removed with their parent; an
/// unmatched `(` or `)` is kept as ordinary text.
pub fn strip_parenthesized(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut open_positions = Vec::new();

    for ch in text.chars() {
        match ch {
            '(' => {
                open_positions.push(output.len());
                output.push(ch);
            }
            ')' => match open_positions.pop() {
                Some(start) => output.truncate(start),
                None => output.push(ch),
            },
            _ => output.push(ch),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::{
        normalize, strip_parenthesized, Levenshtein, LevenshteinWithoutParentheses,
        SimilarityStrategy,
    };

    const PAIRS: &[(&str, &str)] = &[
        ("Python 입문", "파이썬 입문"),
        ("데미안", "데미안 (개정판)"),
        ("", "non-empty"),
        ("Clean Code", "clean  code"),
        ("The Rust Programming Language", "Programming Rust"),
    ];

    #[test]
    fn scores_are_symmetric() {
        for (left, right) in PAIRS {
            assert_eq!(Levenshtein.score(left, right), Levenshtein.score(right, left));
            assert_eq!(
                LevenshteinWithoutParentheses.score(left, right),
                LevenshteinWithoutParentheses.score(right, left)
            );
        }
    }

    #[test]
    fn identical_inputs_score_one() {
        for (left, right) in PAIRS {
            assert_eq!(Levenshtein.score(left, left), 1.0);
            assert_eq!(Levenshtein.score(right, right), 1.0);
        }
        assert_eq!(Levenshtein.score("", ""), 1.0);
    }

    #[test]
    fn scores_stay_in_unit_range() {
        for (left, right) in PAIRS {
            let score = Levenshtein.score(left, right);
            assert!((0.0..=1.0).contains(&score), "{left} vs {right} scored {score}");
        }
        assert_eq!(Levenshtein.score("abc", "xyz"), 0.0);
    }

    #[test]
    fn case_and_whitespace_are_ignored() {
        assert_eq!(Levenshtein.score("Clean Code", "  clean\tCODE "), 1.0);
    }

    #[test]
    fn parenthesized_annotations_do_not_affect_title_identity() {
        assert_eq!(LevenshteinWithoutParentheses.score("Title (Special Edition)", "Title"), 1.0);
        assert_eq!(LevenshteinWithoutParentheses.score("데미안(개정판)", "데미안"), 1.0);
        assert!(Levenshtein.score("Title (Special Edition)", "Title") < 1.0);
    }

    #[test]
    fn strips_nested_pairs_and_keeps_unmatched_parentheses() {
        assert_eq!(strip_parenthesized("a (b (c) d) e"), "a  e");
        assert_eq!(strip_parenthesized("open ( only"), "open ( only");
        assert_eq!(strip_parenthesized("close ) only"), "close ) only");
        assert_eq!(strip_parenthesized("(x)(y)z"), "z");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Hello   World \n"), "hello world");
    }
}
