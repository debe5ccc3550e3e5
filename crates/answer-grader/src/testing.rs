//! Test-only `TextGenerator` that replays canned completions.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use grader_common::error::GenerationError;
use grader_common::generation::TextGenerator;

/// Pops one scripted result per call and records every prompt it was given.
/// Running out of script is reported as `EmptyCompletion`.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: impl IntoIterator<Item = Result<String, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyCompletion))
    }
}

/// Answers evaluation prompts with fixed scores and report prompts with a
/// fixed five-line report. Stateless, so it can serve concurrent callers.
pub struct RubricGenerator {
    pub scores: [u8; 3],
}

#[async_trait]
impl TextGenerator for RubricGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if prompt.contains("Respond with only a JSON object") {
            let [a, b, c] = self.scores;
            return Ok(format!(
                r#"{{"accuracy": {a}, "clarity": {b}, "concepts": {c}, "comments": {{"accuracy": "a", "clarity": "b", "concepts": "c"}}}}"#
            ));
        }
        let score_line = prompt
            .lines()
            .find(|l| l.starts_with("Score: "))
            .unwrap_or("Score: ?");
        Ok(format!(
            "Accuracy: a\nClarity: b\nUnderstanding: c\n{score_line}\nOverall: Fine."
        ))
    }
}
