//! Sentence-level coverage grading for free-form answers.

use log::debug;
use strsim::normalized_levenshtein;

use crate::{GradeResult, Grader};

const MIN_SENTENCE_CHARS: usize = 10;
const MISSED_THRESHOLD: f64 = 0.5;
const COVERED_THRESHOLD: f64 = 0.7;
const MAX_LISTED: usize = 5;

/// Grades how well an answer covers the sentences of a reference text.
///
/// Both texts are split into sentences; each reference sentence scores as
/// its best similarity against any answer sentence, and the final score is
/// the mean over the reference.
#[derive(Debug, Default)]
pub struct ThesisGrader;

struct Coverage {
    sentence: String,
    best: f64,
}

impl ThesisGrader {
    fn sentences(text: &str) -> Vec<String> {
        text.split(['.', '?', '!', '\n'])
            .map(str::trim)
            .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
            .map(str::to_lowercase)
            .collect()
    }

    fn listed(items: &[&Coverage]) -> String {
        items
            .iter()
            .take(MAX_LISTED)
            .map(|c| c.sentence.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Grader for ThesisGrader {
    fn grade(&self, given: &str, reference: &str) -> GradeResult {
        let theses = Self::sentences(reference);
        if theses.is_empty() {
            return GradeResult::incorrect("reference has no sentences to check");
        }
        let answer = Self::sentences(given);
        if answer.is_empty() {
            return GradeResult::incorrect("answer has no sentences to check");
        }

        let coverage: Vec<Coverage> = theses
            .into_iter()
            .map(|sentence| {
                let best = answer
                    .iter()
                    .map(|candidate| normalized_levenshtein(&sentence, candidate))
                    .fold(0.0_f64, f64::max);
                Coverage { sentence, best }
            })
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let mean = coverage.iter().map(|c| c.best).sum::<f64>() / coverage.len() as f64;
        let score = (mean * 1000.0).round() / 1000.0;
        debug!("thesis coverage over {} sentence(s): {score}", coverage.len());

        let missed: Vec<&Coverage> =
            coverage.iter().filter(|c| c.best <= MISSED_THRESHOLD).collect();
        let weak: Vec<&Coverage> = coverage
            .iter()
            .filter(|c| c.best > MISSED_THRESHOLD && c.best < COVERED_THRESHOLD)
            .collect();

        let mut notes = Vec::new();
        if !missed.is_empty() {
            notes.push(format!("Missing: {}", Self::listed(&missed)));
        }
        if !weak.is_empty() {
            notes.push(format!("Partially covered: {}", Self::listed(&weak)));
        }

        GradeResult {
            score,
            comment: if notes.is_empty() { None } else { Some(notes.join(". ")) },
        }
    }
}
