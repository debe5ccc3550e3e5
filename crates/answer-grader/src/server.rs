/// MCP server exposing the grading pipeline.
///
/// Tools:
/// - `grade_answer`: grade one student answer against a reference answer
/// - `describe_rubric`: list the criteria and scale used for grading
/// - `list_models`: list models available on the inference host
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use grader_common::openai::{ModelListResponse, OpenAiClient};

use crate::grader::Grader;
use crate::model::{Criterion, GradingReport, GradingRequest, MAX_RAW_SCORE};
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct GraderServer {
    grader: Grader,
    openai: Arc<OpenAiClient>,
    limiter: Option<RateLimiter>,
    tool_router: ToolRouter<GraderServer>,
}

impl GraderServer {
    pub fn new(grader: Grader, openai: Arc<OpenAiClient>, limiter: Option<RateLimiter>) -> Self {
        Self {
            grader,
            openai,
            limiter,
            tool_router: Self::tool_router(),
        }
    }

    async fn gate(&self) -> Result<(), String> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GradeAnswerParams {
    /// The exam question as posed to the student.
    question: String,
    /// Maximum marks available for the question (must be positive).
    max_score: f64,
    /// The model answer to grade against.
    reference_answer: String,
    /// The student's answer as extracted text. May be empty.
    student_answer: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RubricResponse {
    max_raw_score: u8,
    criteria: Vec<RubricCriterion>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RubricCriterion {
    key: Criterion,
    label: String,
    description: String,
}

#[tool_router]
impl GraderServer {
    #[tool(description = "Grade a student's answer against a reference answer. Scores accuracy, clarity and conceptual understanding from 0-4 each, scales the total to max_score, and returns a written report. `degraded` is true when the model's scoring output could not be parsed and some criteria defaulted to zero.")]
    async fn grade_answer(
        &self,
        Parameters(params): Parameters<GradeAnswerParams>,
    ) -> Result<Json<GradingReport>, String> {
        self.gate().await?;

        let request = GradingRequest::new(
            params.question,
            params.max_score,
            params.reference_answer,
            params.student_answer,
        );
        info!(
            max_score = request.max_score,
            student_chars = request.student_answer.len(),
            "grade_answer invoked"
        );

        let report = self
            .grader
            .grade(&request)
            .await
            .map_err(|e| format!("grading failed: {e}"))?;
        Ok(Json(report))
    }

    #[tool(description = "Describe the grading rubric: criteria keys, report labels, and the raw score scale.")]
    async fn describe_rubric(&self) -> Result<Json<RubricResponse>, String> {
        let criteria = Criterion::ALL
            .iter()
            .map(|c| RubricCriterion {
                key: *c,
                label: c.label().to_string(),
                description: c.description().to_string(),
            })
            .collect();
        Ok(Json(RubricResponse {
            max_raw_score: MAX_RAW_SCORE,
            criteria,
        }))
    }

    #[tool(description = "List models available from the OpenAI-compatible inference host (GET /v1/models).")]
    async fn list_models(&self) -> Result<Json<ModelListResponse>, String> {
        let models = self
            .openai
            .list_models()
            .await
            .map_err(|e| format!("list_models failed: {e}"))?;
        Ok(Json(models))
    }
}

#[tool_handler]
impl ServerHandler for GraderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "answer-grader".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Exam answer grader. Call grade_answer with the question, max_score, reference \
answer and the student's extracted answer text. describe_rubric explains the criteria; \
list_models shows which models the inference host serves."
                    .to_string(),
            ),
        }
    }
}
