//! Grader for fixed-text answers.
//!
//! Checks escalate in cost: digit comparison gates everything, then exact
//! word match, then a word-prefix match for abbreviated answers, and
//! finally fuzzy similarity with a threshold that relaxes for longer
//! answers.

use std::collections::HashSet;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::{GradeResult, Grader};

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 92.0;
const MIN_SIMILARITY_THRESHOLD: f64 = 70.0;
const REDUCTION_FACTOR: f64 = 7.0;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").unwrap())
}

fn digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+").unwrap())
}

/// Grader for answers with one expected text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedGrader;

impl FixedGrader {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Grader for FixedGrader {
    fn grade(&self, given: &str, reference: &str) -> GradeResult {
        let given_digits = extract_digits(given);
        let reference_digits = extract_digits(reference);
        let given_words = extract_words(given);
        let reference_words = extract_words(reference);

        if !digits_match(&given_digits, &reference_digits) {
            return GradeResult::incorrect(format!(
                "numbers differ: answer has [{}], reference has [{}]",
                given_digits.join("; "),
                reference_digits.join("; ")
            ));
        }

        if given_words == reference_words {
            return GradeResult::correct_with("exact match");
        }

        if is_valid_prefix(&given_words, &reference_words) {
            return GradeResult::correct_with("valid prefix of the reference");
        }

        fuzzy_evaluation(&given_words, &reference_words, reference)
    }
}

fn extract_words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    word_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn extract_digits(text: &str) -> Vec<String> {
    digit_re()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Every number in the reference must appear in the answer
fn digits_match(given: &[String], reference: &[String]) -> bool {
    let given: HashSet<&str> = given.iter().map(String::as_str).collect();
    reference.iter().all(|digit| given.contains(digit.as_str()))
}

/// Whether some word window of the answer abbreviates the reference:
/// every reference word must start with the aligned answer word.
fn is_valid_prefix(given: &[String], reference: &[String]) -> bool {
    if reference.is_empty() || given.is_empty() || given.len() < reference.len() {
        return false;
    }
    (0..=given.len() - reference.len()).any(|start| {
        reference
            .iter()
            .enumerate()
            .all(|(i, reference_word)| reference_word.starts_with(given[start + i].as_str()))
    })
}

fn fuzzy_evaluation(given: &[String], reference: &[String], reference_original: &str) -> GradeResult {
    let threshold = similarity_threshold(given.len());
    let similarity =
        strsim::normalized_levenshtein(&given.join(" "), &reference.join(" ")) * 100.0;
    debug!("fuzzy similarity {similarity:.2}% against threshold {threshold:.2}%");

    if similarity >= threshold {
        return GradeResult::correct_with(format!(
            "close enough: {similarity:.2}% with threshold {threshold:.2}%"
        ));
    }
    GradeResult::incorrect(format!(
        "too far from the reference: {similarity:.2}% with threshold {threshold:.2}%, \
         reference: '{reference_original}'"
    ))
}

/// Longer answers may drift further from the reference wording
#[allow(clippy::cast_precision_loss)]
fn similarity_threshold(word_count: usize) -> f64 {
    let threshold =
        DEFAULT_SIMILARITY_THRESHOLD - REDUCTION_FACTOR * ((word_count as f64) + 1.0).ln();
    threshold.max(MIN_SIMILARITY_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_ignores_case_and_punctuation() {
        let result = FixedGrader::new().grade("Метод Ньютона.", "метод ньютона");
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_digit_mismatch_fails_immediately() {
        let result = FixedGrader::new().grade("ответ 5", "ответ 7");
        assert_eq!(result.score, 0.0);
        assert!(result.comment.unwrap().contains("numbers differ"));
    }

    #[test]
    fn test_reference_digits_must_all_appear() {
        let result = FixedGrader::new().grade("значения 3 и 7 и 9", "3 и 7");
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_prefix_abbreviation_accepted() {
        // each reference word starts with the aligned answer word
        let result = FixedGrader::new().grade("лаб раб", "лабораторная работа");
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_fuzzy_accepts_typo() {
        let result = FixedGrader::new().grade(
            "последовательное соединение резисторов",
            "последовательное соединение резистора",
        );
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_unrelated_answer_rejected() {
        let result = FixedGrader::new().grade("осциллограф", "мультиметр");
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_threshold_relaxes_with_length() {
        assert!(similarity_threshold(1) > similarity_threshold(20));
        assert_eq!(similarity_threshold(1000), MIN_SIMILARITY_THRESHOLD);
    }
}
