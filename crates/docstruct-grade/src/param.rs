//! Grading against parametrized references.
//!
//! Reference answers are line-oriented. A line may interpolate per-student
//! parameters as `{name}` and accept value ranges as `[spec]`; lines with
//! neither are plain theses that must appear verbatim in the answer.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::range::RangeSpec;
use crate::{GradeResult, Grader};

fn param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^}]+)\}").unwrap())
}

fn spec_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").unwrap())
}

/// A per-student parameter value.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamValue {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// Grader for references interpolated with per-student parameters.
#[derive(Debug, Default)]
pub struct ParametrizedGrader {
    parameters: HashMap<String, ParamValue>,
}

impl ParametrizedGrader {
    #[must_use]
    pub fn new(parameters: HashMap<String, ParamValue>) -> Self {
        Self { parameters }
    }

    /// Lowercase and collapse runs of whitespace to single spaces.
    fn normalize(text: &str) -> String {
        text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Replace `{name}` placeholders with parameter values. A reference to
    /// a parameter marked incorrect, or to an unknown one, fails the line.
    fn substitute(&self, line: &str) -> Result<String, String> {
        let mut out = String::new();
        let mut last = 0;
        for captures in param_re().captures_iter(line) {
            let whole = captures.get(0).ok_or_else(|| "bad placeholder".to_string())?;
            let name = captures[1].trim();
            let param = self
                .parameters
                .get(name)
                .ok_or_else(|| format!("unknown parameter '{name}'"))?;
            if !param.correct {
                return Err(format!("parameter '{name}' has no valid value"));
            }
            out.push_str(&line[last..whole.start()]);
            out.push_str(&param.text);
            last = whole.end();
        }
        out.push_str(&line[last..]);
        Ok(out)
    }

    /// Check one reference line that carries `[spec]` ranges: the answer
    /// must contain the surrounding text with an acceptable value in each
    /// spec position.
    fn check_spec_line(line: &str, answer: &str) -> Result<(), String> {
        let mut specs = Vec::new();
        let mut pattern = String::new();
        let mut last = 0;
        for captures in spec_re().captures_iter(line) {
            let whole = captures.get(0).ok_or_else(|| "bad range".to_string())?;
            let spec = RangeSpec::parse(&captures[1]);
            pattern.push_str(&regex::escape(line[last..whole.start()].trim()));
            pattern.push_str(r"\s*");
            pattern.push_str(spec.regex_fragment());
            pattern.push_str(r"\s*");
            specs.push(spec);
            last = whole.end();
        }
        pattern.push_str(&regex::escape(line[last..].trim()));

        let re = Regex::new(&pattern).map_err(|e| format!("unusable reference line: {e}"))?;
        let Some(captures) = re.captures(answer) else {
            return Err(format!("missing: {}", line.trim()));
        };
        for (index, spec) in specs.iter().enumerate() {
            let value = captures
                .get(index + 1)
                .map(|m| m.as_str())
                .unwrap_or_default();
            if !spec.matches(value) {
                return Err(format!("'{}' is outside {}", value, spec.raw()));
            }
        }
        Ok(())
    }
}

impl Grader for ParametrizedGrader {
    fn grade(&self, given: &str, reference: &str) -> GradeResult {
        let answer = Self::normalize(given);
        let mut errors = Vec::new();

        for line in reference.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let line = match self.substitute(line) {
                Ok(line) => line,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };
            let line = Self::normalize(&line);
            let outcome = if spec_re().is_match(&line) {
                Self::check_spec_line(&line, &answer)
            } else if answer.contains(&line) {
                Ok(())
            } else {
                Err(format!("missing: {line}"))
            };
            if let Err(error) = outcome {
                errors.push(error);
            }
        }

        debug!("parametrized grading finished with {} error(s)", errors.len());
        if errors.is_empty() {
            GradeResult::correct()
        } else {
            GradeResult::incorrect(errors.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str, bool)]) -> HashMap<String, ParamValue> {
        entries
            .iter()
            .map(|(name, text, correct)| {
                (
                    (*name).to_string(),
                    ParamValue { text: (*text).to_string(), correct: *correct },
                )
            })
            .collect()
    }

    #[test]
    fn test_thesis_line_containment() {
        let grader = ParametrizedGrader::default();
        let result = grader.grade(
            "Сначала измеряем напряжение, затем ток.",
            "измеряем напряжение",
        );
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_missing_thesis_line() {
        let grader = ParametrizedGrader::default();
        let result = grader.grade("только ток", "измеряем напряжение\nизмеряем ток");
        assert_eq!(result.score, 0.0);
        assert!(result.comment.unwrap().contains("напряжение"));
    }

    #[test]
    fn test_parameter_substitution() {
        let grader = ParametrizedGrader::new(params(&[("резистор", "r7", true)]));
        let result = grader.grade("используем r7 в схеме", "используем {резистор}");
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_incorrect_parameter_fails_line() {
        let grader = ParametrizedGrader::new(params(&[("резистор", "r7", false)]));
        let result = grader.grade("используем r7", "используем {резистор}");
        assert_eq!(result.score, 0.0);
        assert!(result.comment.unwrap().contains("резистор"));
    }

    #[test]
    fn test_range_value_in_line() {
        let grader = ParametrizedGrader::default();
        let result = grader.grade("ток равен 4.2 ампера", "ток равен [4 - 5] ампера");
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_range_value_out_of_bounds() {
        let grader = ParametrizedGrader::default();
        let result = grader.grade("ток равен 9 ампера", "ток равен [4 - 5] ампера");
        assert_eq!(result.score, 0.0);
        assert!(result.comment.unwrap().contains("4 - 5"));
    }

    #[test]
    fn test_text_alternatives_in_range() {
        let grader = ParametrizedGrader::default();
        let result = grader.grade("питание on", "питание [on | off]");
        assert_eq!(result.score, 1.0);
    }
}
