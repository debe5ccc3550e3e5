/// Final report composition.
///
/// Unlike the evaluation stage, the completion here is never validated: it is
/// the text a marker reads, and it is returned exactly as generated.
use std::sync::Arc;

use tracing::debug;

use grader_common::error::GenerationError;
use grader_common::generation::TextGenerator;

use crate::model::{AggregatedResult, CriterionScore, GradingReport};
use crate::prompt::report_prompt;

#[derive(Clone)]
pub struct FeedbackComposer {
    generator: Arc<dyn TextGenerator>,
}

impl FeedbackComposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn compose(
        &self,
        aggregated: &AggregatedResult,
        scores: &[CriterionScore],
    ) -> Result<GradingReport, GenerationError> {
        let prompt = report_prompt(aggregated, scores);
        let report_text = self.generator.generate(&prompt).await?;
        debug!(chars = report_text.len(), "report completion received");

        Ok(GradingReport {
            scaled_score: aggregated.scaled_score,
            max_score: aggregated.max_score,
            total_raw: aggregated.total_raw,
            max_raw: aggregated.max_raw,
            per_criterion_comments: scores
                .iter()
                .map(|s| (s.criterion, s.comment.clone()))
                .collect(),
            overall_summary: overall_summary(&report_text),
            report_text,
            criteria: scores.to_vec(),
            degraded: false,
        })
    }
}

/// Text after the first `Overall:` (or `Overall summary:`) label, or the last
/// non-empty line when the model ignored the requested layout.
fn overall_summary(report_text: &str) -> String {
    let lines = || report_text.lines().map(str::trim).filter(|l| !l.is_empty());

    lines()
        .find_map(summary_after_label)
        .or_else(|| lines().last())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Accepts `Overall:`, `Overall summary:` and markdown-decorated variants such
/// as `**Overall:**`; rejects lines like `Overall score: 3/4`.
fn summary_after_label(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(['*', '-', '#', ' ']);
    if !rest.get(..7)?.eq_ignore_ascii_case("overall") {
        return None;
    }
    let mut after = rest[7..].trim_start();
    if after
        .get(..7)
        .is_some_and(|w| w.eq_ignore_ascii_case("summary"))
    {
        after = after[7..].trim_start();
    }
    let after = after.trim_start_matches('*').strip_prefix(':')?;
    Some(after.trim_start_matches(['*', ' ']).trim())
}
