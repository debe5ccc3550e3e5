use std::str::FromStr;
use std::time::Duration;

use grader_common::generation::GenerationSettings;
use grader_common::openai::OpenAiClientConfig;

use crate::error::AppError;

const DEFAULT_MODEL: &str = "google/gemma-2-2b-it";

/// Service configuration loaded explicitly from environment variables.
///
/// Transport settings (`OPENAI_*`) are read by `OpenAiClientConfig`.
/// Grading settings are optional but must parse when present:
/// - `GRADER_MODEL` (default: `google/gemma-2-2b-it`)
/// - `GRADER_TEMPERATURE` (default: 0.001)
/// - `GRADER_MAX_TOKENS` (default: 512)
/// - `GENERATION_TIMEOUT_SECS`: upper bound per completion (default: 60)
/// - `RATE_LIMIT_RPS`: grading requests per second (unset or 0 disables)
#[derive(Debug, Clone)]
pub struct Config {
    pub openai: OpenAiClientConfig,
    pub generation: GenerationSettings,
    pub generation_timeout: Duration,
    pub rate_limit_rps: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok(), OpenAiClientConfig::from_env())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        openai: OpenAiClientConfig,
    ) -> Result<Self, AppError> {
        let model = lookup("GRADER_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let temperature: f32 = parse_var(&lookup, "GRADER_TEMPERATURE")?.unwrap_or(0.001);
        let max_tokens: u32 = parse_var(&lookup, "GRADER_MAX_TOKENS")?.unwrap_or(512);
        let timeout_secs: u64 = parse_var(&lookup, "GENERATION_TIMEOUT_SECS")?.unwrap_or(60);
        if timeout_secs == 0 {
            return Err(AppError::Config(
                "GENERATION_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        let rate_limit_rps: u32 = parse_var(&lookup, "RATE_LIMIT_RPS")?.unwrap_or(0);

        Ok(Self {
            openai,
            generation: GenerationSettings {
                model,
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
            generation_timeout: Duration::from_secs(timeout_secs),
            rate_limit_rps,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, AppError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| AppError::Config(format!("{name} has an invalid value: {raw:?}")))
}
