/// Criterion evaluation: one generation call scoring every rubric dimension.
///
/// The completion is untrusted. Parsing is defensive: a completion that holds
/// no usable JSON object zeroes every criterion, and individual fields that are
/// missing or non-numeric zero only their own criterion. Either case marks the
/// evaluation as degraded instead of failing the grading call.
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use grader_common::error::GenerationError;
use grader_common::generation::TextGenerator;

use crate::model::{Criterion, CriterionScore, GradingRequest, MAX_RAW_SCORE};
use crate::prompt::evaluation_prompt;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid regex"));

/// Why an evaluation completion could not be used as a whole.
#[derive(Debug, thiserror::Error)]
pub enum MalformedOutput {
    #[error("no JSON object found in completion")]
    NoObject,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Scores for every criterion, in `Criterion::ALL` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub scores: Vec<CriterionScore>,
    pub degraded: bool,
}

#[derive(Clone)]
pub struct CriterionEvaluator {
    generator: Arc<dyn TextGenerator>,
}

impl CriterionEvaluator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn evaluate(&self, request: &GradingRequest) -> Result<Evaluation, GenerationError> {
        let prompt = evaluation_prompt(request);
        let completion = self.generator.generate(&prompt).await?;
        debug!(chars = completion.len(), "evaluation completion received");
        Ok(parse_evaluation(&completion))
    }
}

pub fn parse_evaluation(completion: &str) -> Evaluation {
    let object = match extract_object(completion) {
        Ok(object) => object,
        Err(e) => {
            warn!(error = %e, "malformed evaluation output, scoring all criteria as zero");
            return Evaluation {
                scores: Criterion::ALL.iter().map(|c| CriterionScore::zero(*c)).collect(),
                degraded: true,
            };
        }
    };

    let comments = object.get("comments").and_then(Value::as_object);
    let mut degraded = false;
    let scores: Vec<CriterionScore> = Criterion::ALL
        .iter()
        .map(|&criterion| {
            let raw_score = match lookup(&object, criterion).map(coerce_score) {
                Some(Some(score)) => score,
                Some(None) => {
                    warn!(%criterion, "non-numeric score, defaulting to zero");
                    degraded = true;
                    0
                }
                None => {
                    warn!(%criterion, "score missing, defaulting to zero");
                    degraded = true;
                    0
                }
            };
            let comment = comments
                .and_then(|c| lookup(c, criterion))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            CriterionScore::new(criterion, raw_score, comment)
        })
        .collect();

    Evaluation { scores, degraded }
}

/// Prefers a fenced block; otherwise takes the first complete JSON value that
/// starts at any `{`, so prose on either side (braces included) is ignored.
fn extract_object(completion: &str) -> Result<Map<String, Value>, MalformedOutput> {
    if let Some(block) = FENCED_BLOCK.captures(completion).and_then(|c| c.get(1)) {
        return into_object(serde_json::from_str(block.as_str())?);
    }

    let mut first_error = None;
    for (start, _) in completion.match_indices('{') {
        let mut values =
            serde_json::Deserializer::from_str(&completion[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => return into_object(value),
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }
    Err(first_error.map_or(MalformedOutput::NoObject, MalformedOutput::InvalidJson))
}

fn into_object(value: Value) -> Result<Map<String, Value>, MalformedOutput> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(MalformedOutput::NotAnObject("array")),
        _ => Err(MalformedOutput::NotAnObject("scalar")),
    }
}

fn lookup(object: &Map<String, Value>, criterion: Criterion) -> Option<&Value> {
    object.get(criterion.key()).or_else(|| {
        criterion
            .aliases()
            .iter()
            .find_map(|alias| object.get(*alias))
    })
}

/// Numbers and numeric strings are rounded and clamped into `0..=4`;
/// anything else yields `None`.
fn coerce_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    let clamped = number.round().clamp(0.0, f64::from(MAX_RAW_SCORE));
    if clamped != number {
        debug!(value = number, clamped, "score coerced into range");
    }
    Some(clamped as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    fn raw(evaluation: &Evaluation) -> Vec<u8> {
        evaluation.scores.iter().map(|s| s.raw_score).collect()
    }

    #[test]
    fn parses_well_formed_object() {
        let eval = parse_evaluation(
            r#"{"accuracy": 3, "clarity": 4, "concepts": 2,
                "comments": {"accuracy": "Mostly right.", "clarity": " Clear. ", "concepts": "Thin."}}"#,
        );
        assert!(!eval.degraded);
        assert_eq!(raw(&eval), vec![3, 4, 2]);
        assert_eq!(eval.scores[1].comment, "Clear.");
        assert_eq!(eval.scores[2].criterion, Criterion::Concepts);
    }

    #[test]
    fn finds_object_inside_fence_or_prose() {
        let fenced = "Here you go:\n```json\n{\"accuracy\": 1, \"clarity\": 1, \"concepts\": 1}\n```\nThanks!";
        assert_eq!(raw(&parse_evaluation(fenced)), vec![1, 1, 1]);

        let prose = "Sure. {\"accuracy\": 2, \"clarity\": 3, \"concepts\": 4} Hope that helps.";
        let eval = parse_evaluation(prose);
        assert_eq!(raw(&eval), vec![2, 3, 4]);
        assert!(!eval.degraded);
    }

    #[test]
    fn braces_in_surrounding_prose_are_ignored() {
        let trailing = r#"{"accuracy": 3, "clarity": 2, "concepts": 1} (each scored on a {0-4} scale)"#;
        let eval = parse_evaluation(trailing);
        assert_eq!(raw(&eval), vec![3, 2, 1]);
        assert!(!eval.degraded);

        let leading = r#"Scale {0-4}. {"accuracy": 4, "clarity": 4, "concepts": 3}"#;
        let eval = parse_evaluation(leading);
        assert_eq!(raw(&eval), vec![4, 4, 3]);
        assert!(!eval.degraded);
    }

    #[test]
    fn garbage_degrades_to_all_zero() {
        for completion in ["", "Score: 3\nExplanation: good", "} backwards {", "[1, 2, 3]", "{not json}"] {
            let eval = parse_evaluation(completion);
            assert!(eval.degraded, "expected degraded for {completion:?}");
            assert_eq!(raw(&eval), vec![0, 0, 0]);
            assert!(eval.scores.iter().all(|s| s.comment.is_empty()));
        }
    }

    #[test]
    fn out_of_range_and_fractional_scores_are_coerced() {
        let eval = parse_evaluation(r#"{"accuracy": 7, "clarity": -2, "concepts": 2.6}"#);
        assert_eq!(raw(&eval), vec![4, 0, 3]);
        assert!(!eval.degraded);
    }

    #[test]
    fn numeric_strings_and_aliases_are_accepted() {
        let eval = parse_evaluation(r#"{"accuracy": "3", "clarity": " 2 ", "use_of_concepts": 4}"#);
        assert_eq!(raw(&eval), vec![3, 2, 4]);
        assert!(!eval.degraded);
    }

    #[test]
    fn missing_or_non_numeric_fields_zero_only_their_criterion() {
        let eval = parse_evaluation(
            r#"{"accuracy": 4, "clarity": "excellent", "comments": {"accuracy": "Spot on."}}"#,
        );
        assert_eq!(raw(&eval), vec![4, 0, 0]);
        assert!(eval.degraded);
        assert_eq!(eval.scores[0].comment, "Spot on.");
        assert_eq!(eval.scores[1].comment, "");
    }

    #[tokio::test]
    async fn evaluate_issues_exactly_one_call() {
        let generator = Arc::new(ScriptedGenerator::new([Ok(
            r#"{"accuracy": 3, "clarity": 3, "concepts": 3}"#.to_string(),
        )]));
        let evaluator = CriterionEvaluator::new(generator.clone());
        let request = GradingRequest::new("Q?", 4.0, "ref", "student text");

        let eval = evaluator.evaluate(&request).await.unwrap();

        assert_eq!(raw(&eval), vec![3, 3, 3]);
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Student's Answer: student text"));
    }

    #[tokio::test]
    async fn evaluate_propagates_transport_errors() {
        let generator = Arc::new(ScriptedGenerator::new([Err(GenerationError::EmptyCompletion)]));
        let evaluator = CriterionEvaluator::new(generator);
        let request = GradingRequest::new("Q?", 4.0, "ref", "");
        assert!(matches!(
            evaluator.evaluate(&request).await,
            Err(GenerationError::EmptyCompletion)
        ));
    }
}
