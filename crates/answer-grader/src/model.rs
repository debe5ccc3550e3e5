use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Highest raw score a single criterion can receive.
pub const MAX_RAW_SCORE: u8 = 4;

/// Rubric dimension scored by the evaluator. Declaration order is report order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Accuracy,
    Clarity,
    Concepts,
}

impl Criterion {
    pub const ALL: [Criterion; 3] = [Criterion::Accuracy, Criterion::Clarity, Criterion::Concepts];

    /// Key used in the evaluation prompt's JSON object.
    pub fn key(self) -> &'static str {
        match self {
            Criterion::Accuracy => "accuracy",
            Criterion::Clarity => "clarity",
            Criterion::Concepts => "concepts",
        }
    }

    /// Line label in the final report.
    pub fn label(self) -> &'static str {
        match self {
            Criterion::Accuracy => "Accuracy",
            Criterion::Clarity => "Clarity",
            Criterion::Concepts => "Understanding",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Criterion::Accuracy => "Is the answer correct?",
            Criterion::Clarity => "Is the answer clear and well-expressed?",
            Criterion::Concepts => "Does the answer demonstrate understanding of key concepts?",
        }
    }

    /// Alternative keys models have been seen to emit.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Criterion::Concepts => &["use_of_concepts", "understanding"],
            _ => &[],
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One answer to grade. Built once per call and never modified.
#[derive(Debug, Clone)]
pub struct GradingRequest {
    /// The exam question as posed to the student.
    pub question: String,
    /// Maximum marks available for the question. Must be positive.
    pub max_score: f64,
    /// The model answer the student is compared against.
    pub reference_answer: String,
    /// The student's answer, usually OCR output. May be empty or noisy.
    pub student_answer: String,
}

impl GradingRequest {
    pub fn new(
        question: impl Into<String>,
        max_score: f64,
        reference_answer: impl Into<String>,
        student_answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            max_score,
            reference_answer: reference_answer.into(),
            student_answer: student_answer.into(),
        }
    }

    /// Rejects requests that cannot be graded meaningfully. The student answer
    /// is deliberately not checked: blank OCR output still earns a report.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.question.trim().is_empty() {
            return Err(InputError::EmptyField("question"));
        }
        if self.reference_answer.trim().is_empty() {
            return Err(InputError::EmptyField("reference_answer"));
        }
        validate_max_score(self.max_score)
    }
}

pub fn validate_max_score(max_score: f64) -> Result<(), InputError> {
    if max_score.is_finite() && max_score > 0.0 {
        Ok(())
    } else {
        Err(InputError::InvalidMaxScore(max_score))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct CriterionScore {
    pub criterion: Criterion,
    /// Always within `0..=MAX_RAW_SCORE`.
    pub raw_score: u8,
    pub comment: String,
}

impl CriterionScore {
    /// Builds a score, clamping `raw_score` into range.
    pub fn new(criterion: Criterion, raw_score: u8, comment: impl Into<String>) -> Self {
        Self {
            criterion,
            raw_score: raw_score.min(MAX_RAW_SCORE),
            comment: comment.into(),
        }
    }

    pub fn zero(criterion: Criterion) -> Self {
        Self::new(criterion, 0, String::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub total_raw: u32,
    pub max_raw: u32,
    pub max_score: f64,
    /// `total_raw / max_raw * max_score`, rounded half-up to 2 decimals.
    pub scaled_score: f64,
}

/// Terminal artifact handed back to the caller.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GradingReport {
    pub scaled_score: f64,
    pub max_score: f64,
    pub total_raw: u32,
    pub max_raw: u32,
    pub per_criterion_comments: BTreeMap<Criterion, String>,
    pub overall_summary: String,
    /// Verbatim output of the report-stage generation call.
    pub report_text: String,
    pub criteria: Vec<CriterionScore>,
    /// True when the evaluation output could not be fully parsed and some
    /// criteria were scored as zero by default.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_are_fixed_and_ordered() {
        assert_eq!(Criterion::ALL.len(), 3);
        let mut sorted = Criterion::ALL;
        sorted.sort();
        assert_eq!(sorted, Criterion::ALL);
        assert_eq!(Criterion::Concepts.label(), "Understanding");
        assert_eq!(
            serde_json::to_string(&Criterion::Concepts).unwrap(),
            "\"concepts\""
        );
    }

    #[test]
    fn criterion_score_clamps_raw_score() {
        assert_eq!(CriterionScore::new(Criterion::Clarity, 9, "").raw_score, 4);
        assert_eq!(CriterionScore::zero(Criterion::Clarity).raw_score, 0);
    }

    #[test]
    fn validate_rejects_blank_fields_and_bad_max_score() {
        let ok = GradingRequest::new("Q?", 4.0, "ref", "");
        assert_eq!(ok.validate(), Ok(()));

        assert_eq!(
            GradingRequest::new("   ", 4.0, "ref", "a").validate(),
            Err(InputError::EmptyField("question"))
        );
        assert_eq!(
            GradingRequest::new("Q?", 4.0, "\n", "a").validate(),
            Err(InputError::EmptyField("reference_answer"))
        );
        assert!(matches!(
            GradingRequest::new("Q?", 0.0, "ref", "a").validate(),
            Err(InputError::InvalidMaxScore(_))
        ));
        assert!(matches!(
            GradingRequest::new("Q?", -3.0, "ref", "a").validate(),
            Err(InputError::InvalidMaxScore(_))
        ));
        assert!(matches!(
            GradingRequest::new("Q?", f64::NAN, "ref", "a").validate(),
            Err(InputError::InvalidMaxScore(_))
        ));
    }

    #[test]
    fn report_serializes_comments_keyed_by_criterion() {
        let report = GradingReport {
            scaled_score: 3.0,
            max_score: 4.0,
            total_raw: 9,
            max_raw: 12,
            per_criterion_comments: Criterion::ALL
                .iter()
                .map(|c| (*c, format!("{c} ok")))
                .collect(),
            overall_summary: "Solid.".to_string(),
            report_text: "Overall: Solid.".to_string(),
            criteria: vec![],
            degraded: false,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["per_criterion_comments"]["concepts"], "concepts ok");
        assert_eq!(json["degraded"], false);
    }
}
