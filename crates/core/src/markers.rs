//! Extraction of structured scores from free-text backend judgments.
//!
//! Backends answer in prose and are asked to end with a marker line such as
//! `FINAL_SCORE: 4`. Extraction never fails: a missing or malformed marker
//! yields the most conservative value.

use regex::Regex;
use std::sync::LazyLock;

/// Relevance used when the judgment carries no usable score.
pub const DEFAULT_RELEVANCE: u8 = 1;

/// Understanding used when the grading carries no usable percentage.
pub const DEFAULT_UNDERSTANDING: u8 = 0;

static RELEVANCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FINAL_SCORE:\**\s*(\d)").expect("hardcoded regex"));

static PERCENTAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FINAL_PERCENTAGE:\**\s*(\d+)").expect("hardcoded regex"));

/// Reads `FINAL_SCORE: <digit>` and clamps it into 1..=5.
pub fn relevance_score(judgment: &str) -> u8 {
    RELEVANCE_MARKER
        .captures(judgment)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .map(|score| score.clamp(1, 5))
        .unwrap_or(DEFAULT_RELEVANCE)
}

/// Reads `FINAL_PERCENTAGE: <n>` and caps it at 100.
pub fn understanding_score(grading: &str) -> u8 {
    PERCENTAGE_MARKER
        .captures(grading)
        // The capture is all digits, so parsing only fails on overflow.
        .map(|caps| caps[1].parse::<u32>().unwrap_or(u32::MAX))
        .map(|pct| pct.min(100) as u8)
        .unwrap_or(DEFAULT_UNDERSTANDING)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_marker_is_parsed() {
        let judgment = "The context covers most objectives.\nFINAL_SCORE: 4";
        assert_eq!(relevance_score(judgment), 4);
    }

    #[test]
    fn test_relevance_marker_tolerates_markdown() {
        assert_eq!(relevance_score("**FINAL_SCORE:** 5"), 5);
        assert_eq!(relevance_score("FINAL_SCORE:3/5"), 3);
    }

    #[test]
    fn test_relevance_defaults_to_one() {
        assert_eq!(relevance_score("Looks fine to me."), 1);
        assert_eq!(relevance_score(""), 1);
        assert_eq!(relevance_score("FINAL_SCORE: high"), 1);
    }

    #[test]
    fn test_relevance_is_clamped() {
        assert_eq!(relevance_score("FINAL_SCORE: 0"), 1);
        assert_eq!(relevance_score("FINAL_SCORE: 9"), 5);
    }

    #[test]
    fn test_percentage_marker_is_parsed() {
        let grading = "Q1 correct, Q2 wrong.\nFINAL_PERCENTAGE: 60";
        assert_eq!(understanding_score(grading), 60);
    }

    #[test]
    fn test_percentage_defaults_to_zero() {
        assert_eq!(understanding_score("You did well!"), 0);
        assert_eq!(understanding_score("FINAL_PERCENTAGE: ??"), 0);
    }

    #[test]
    fn test_percentage_is_capped() {
        assert_eq!(understanding_score("FINAL_PERCENTAGE: 120"), 100);
        assert_eq!(understanding_score("FINAL_PERCENTAGE: 99999999999999"), 100);
    }

    #[test]
    fn test_same_judgment_yields_same_score() {
        let judgment = "FINAL_SCORE: 2";
        assert_eq!(relevance_score(judgment), relevance_score(judgment));
    }
}
