/// Linear normalization of raw rubric scores onto the question's mark scale.
///
/// Rounding is half-up to two decimals (`2.125 -> 2.13`). Scores are never
/// negative, so `f64::round`'s half-away-from-zero behaves as half-up.
use crate::error::InputError;
use crate::model::{validate_max_score, AggregatedResult, CriterionScore, MAX_RAW_SCORE};

pub fn aggregate(scores: &[CriterionScore], max_score: f64) -> Result<AggregatedResult, InputError> {
    if scores.is_empty() {
        return Err(InputError::NoCriteria);
    }
    validate_max_score(max_score)?;

    let total_raw: u32 = scores
        .iter()
        .map(|s| u32::from(s.raw_score.min(MAX_RAW_SCORE)))
        .sum();
    let max_raw = u32::from(MAX_RAW_SCORE) * scores.len() as u32;

    let scaled = f64::from(total_raw) / f64::from(max_raw) * max_score;
    let scaled_score = round_half_up_2dp(scaled).clamp(0.0, max_score);

    Ok(AggregatedResult {
        total_raw,
        max_raw,
        max_score,
        scaled_score,
    })
}

/// Values too large to carry cents are returned as-is.
fn round_half_up_2dp(value: f64) -> f64 {
    let cents = value * 100.0;
    if !cents.is_finite() {
        return value;
    }
    cents.round() / 100.0
}
