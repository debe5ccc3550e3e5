/// Grading orchestrator: evaluate, aggregate, compose.
///
/// Input problems fail before any generation call. Malformed evaluation output
/// is absorbed by the evaluator and surfaces only as `degraded`. Transport
/// failures abort the call as `GradingError::Generation`; nothing is retried
/// here.
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use grader_common::generation::{TextGenerator, TimeBounded};

use crate::aggregate::aggregate;
use crate::error::{GradingError, Stage};
use crate::evaluator::CriterionEvaluator;
use crate::feedback::FeedbackComposer;
use crate::model::{GradingReport, GradingRequest};

#[derive(Clone)]
pub struct Grader {
    evaluator: CriterionEvaluator,
    composer: FeedbackComposer,
}

impl Grader {
    /// Every generation call made through this grader is bounded by
    /// `generation_timeout`.
    pub fn new(generator: Arc<dyn TextGenerator>, generation_timeout: Duration) -> Self {
        let bounded: Arc<dyn TextGenerator> =
            Arc::new(TimeBounded::new(generator, generation_timeout));
        Self {
            evaluator: CriterionEvaluator::new(Arc::clone(&bounded)),
            composer: FeedbackComposer::new(bounded),
        }
    }

    pub async fn grade(&self, request: &GradingRequest) -> Result<GradingReport, GradingError> {
        request.validate()?;
        let started = Instant::now();

        let evaluation = self.evaluator.evaluate(request).await.map_err(|source| {
            warn!(error = %source, "evaluation call failed");
            GradingError::Generation {
                stage: Stage::Evaluation,
                source,
            }
        })?;

        let aggregated = aggregate(&evaluation.scores, request.max_score)?;
        info!(
            total_raw = aggregated.total_raw,
            max_raw = aggregated.max_raw,
            scaled_score = aggregated.scaled_score,
            max_score = aggregated.max_score,
            degraded = evaluation.degraded,
            "answer scored"
        );

        let report = self
            .composer
            .compose(&aggregated, &evaluation.scores)
            .await
            .map_err(|source| {
                warn!(error = %source, "report call failed");
                GradingError::Generation {
                    stage: Stage::Report,
                    source,
                }
            })?;

        info!(
            elapsed_ms = started.elapsed().as_millis(),
            "grading complete"
        );
        Ok(GradingReport {
            degraded: evaluation.degraded,
            ..report
        })
    }
}
