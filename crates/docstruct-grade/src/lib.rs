//! Answer graders.
//!
//! Each grader compares a student's answer against a reference answer and
//! produces a [`GradeResult`]: a score in `[0.0, 1.0]` and an optional
//! comment for the reviewer.
//!
//! - [`fixed::FixedGrader`] for short fixed-text answers, escalating from
//!   digit and word comparison to fuzzy similarity
//! - [`param::ParametrizedGrader`] for reference answers with `{param}`
//!   placeholders and `[range]` specifications
//! - [`thesis::ThesisGrader`] for free-form answers checked for coverage
//!   of reference thesis sentences
//! - [`range::RangeSpec`] parses the `[1-5 | 7 | abc]` value
//!   specifications used by the parametrized grader

pub mod fixed;
pub mod param;
pub mod range;
pub mod thesis;

pub use fixed::FixedGrader;
pub use param::{ParamValue, ParametrizedGrader};
pub use range::RangeSpec;
pub use thesis::ThesisGrader;

/// Outcome of grading one answer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GradeResult {
    /// Score in `[0.0, 1.0]`
    pub score: f64,
    /// Reviewer-facing explanation, present when the score is not full
    /// or the decision needs context
    pub comment: Option<String>,
}

impl GradeResult {
    /// Full score without commentary
    #[inline]
    #[must_use]
    pub const fn correct() -> Self {
        Self {
            score: 1.0,
            comment: None,
        }
    }

    /// Full score with an explanation
    #[must_use]
    pub fn correct_with(comment: impl Into<String>) -> Self {
        Self {
            score: 1.0,
            comment: Some(comment.into()),
        }
    }

    /// Zero score with an explanation
    #[must_use]
    pub fn incorrect(comment: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            comment: Some(comment.into()),
        }
    }
}

/// A grader compares a given answer against a reference answer.
pub trait Grader {
    fn grade(&self, given: &str, reference: &str) -> GradeResult;
}
