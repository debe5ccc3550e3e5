/// Errors raised by the text-generation layer.
///
/// Everything the grading pipeline sees from the upstream model goes through
/// `GenerationError`; the service crate wraps it with the stage that failed.
use std::time::Duration;

use crate::openai::OpenAiClientError;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Client(#[from] OpenAiClientError),

    #[error("completion contained no text")]
    EmptyCompletion,

    #[error("generation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}
