//! Classifiers for the free-text class and term names schools type in.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryLevel {
    Lower,
    Upper,
}

const LOWER_KEYWORDS: [&str; 5] = ["nursery", "baby", "middle", "top", "kindergarten"];
const LOWER_GRADE_WORDS: [&str; 3] = ["one", "two", "three"];

/// `1`..`3` not followed by another digit, so `3A` and `2east` count but
/// `10` does not.
fn starts_with_lower_grade(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some('1'..='3')) && !chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn tokens(s: &str) -> Vec<String> {
    s.to_ascii_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '.' | '-' | '_' | '/' | ','))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Nursery classes and P1 to P3 are lower primary; everything else is upper.
///
/// Accepted lower forms: the words nursery, baby, middle, top and
/// kindergarten anywhere in the name; `P1`..`P3` written as `P1`, `P.1`,
/// `P 1` or `P-1`, optionally followed by a stream (`P3A`, `P.1B`,
/// `P2East`); and `Primary 1`..`Primary 3` (digits or words, `Primary1`).
pub fn primary_level(class_name: &str) -> PrimaryLevel {
    let toks = tokens(class_name);
    for (i, t) in toks.iter().enumerate() {
        if LOWER_KEYWORDS.contains(&t.as_str()) {
            return PrimaryLevel::Lower;
        }
        let rest = t.strip_prefix("primary").or_else(|| t.strip_prefix('p'));
        match rest {
            Some("") => {
                if let Some(next) = toks.get(i + 1) {
                    if LOWER_GRADE_WORDS.contains(&next.as_str()) || starts_with_lower_grade(next) {
                        return PrimaryLevel::Lower;
                    }
                }
            }
            Some(rest) if starts_with_lower_grade(rest) => return PrimaryLevel::Lower,
            _ => {}
        }
    }
    PrimaryLevel::Upper
}

/// Whether a term label denotes the third (promotion) term.
///
/// Accepted forms, case-insensitive: `3`, `three`, `iii`, `third`, with or
/// without the word `term` before (`term 3`, `term3`) or after
/// (`third term`).
pub fn is_term_three(term: &str) -> bool {
    let toks = tokens(term);
    let rest: Vec<&str> = toks
        .iter()
        .map(String::as_str)
        .filter(|t| *t != "term")
        .collect();
    match rest.as_slice() {
        [only] => {
            let t = only.strip_prefix("term").unwrap_or(only);
            matches!(t, "3" | "three" | "iii" | "third")
        }
        _ => false,
    }
}
