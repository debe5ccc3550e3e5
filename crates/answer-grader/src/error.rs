use std::fmt;

use grader_common::error::GenerationError;

/// Caller-side problems detected before any generation call is made.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("max_score must be a positive finite number, got {0}")]
    InvalidMaxScore(f64),

    #[error("at least one criterion score is required")]
    NoCriteria,
}

/// Pipeline stage that issued a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Evaluation,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Evaluation => f.write_str("criterion evaluation"),
            Stage::Report => f.write_str("report composition"),
        }
    }
}

/// The only error `Grader::grade` returns.
#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    #[error("invalid grading request: {0}")]
    Input(#[from] InputError),

    #[error("text generation failed during {stage}: {source}")]
    Generation {
        stage: Stage,
        #[source]
        source: GenerationError,
    },
}

/// Startup errors for the service binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
}
