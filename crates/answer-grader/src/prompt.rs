/// Prompt templates for the two generation calls made per grading request.
use crate::model::{AggregatedResult, Criterion, CriterionScore, GradingRequest, MAX_RAW_SCORE};

pub fn evaluation_prompt(request: &GradingRequest) -> String {
    let criteria: String = Criterion::ALL
        .iter()
        .map(|c| format!("- {}: {}\n", c.key(), c.description()))
        .collect();

    format!(
        "You are an exam marker. Compare the student's answer with the correct answer and \
score it on each criterion below using a whole number from 0 (absent or wrong) to {max_raw} \
(complete and correct). Give a one-sentence comment for each criterion.\n\n\
Criteria:\n{criteria}\n\
Question: {question}\n\
Context: the question is worth {max_score} marks in total. Marks are scaled from your \
criterion scores afterwards, so score every criterion from 0 to {max_raw} regardless.\n\
Correct Answer: {reference}\n\
Student's Answer: {student}\n\n\
Respond with only a JSON object and no other text, in exactly this shape:\n{shape}\n",
        max_raw = MAX_RAW_SCORE,
        question = request.question.trim(),
        max_score = request.max_score,
        reference = request.reference_answer.trim(),
        student = request.student_answer.trim(),
        shape = evaluation_shape(),
    )
}

fn evaluation_shape() -> String {
    let scores: Vec<String> = Criterion::ALL
        .iter()
        .map(|c| format!("\"{}\": <integer 0-{MAX_RAW_SCORE}>", c.key()))
        .collect();
    let comments: Vec<String> = Criterion::ALL
        .iter()
        .map(|c| format!("\"{}\": \"<one sentence>\"", c.key()))
        .collect();
    format!(
        "{{{}, \"comments\": {{{}}}}}",
        scores.join(", "),
        comments.join(", ")
    )
}

pub fn report_prompt(aggregated: &AggregatedResult, scores: &[CriterionScore]) -> String {
    let comments: String = scores
        .iter()
        .map(|s| format!("- {}: {}\n", s.criterion.label(), comment_or_placeholder(s)))
        .collect();
    let lines: String = scores
        .iter()
        .map(|s| format!("{}: <comment>\n", s.criterion.label()))
        .collect();

    format!(
        "Write a grading report for a student's exam answer.\n\n\
Score: {score:.2}/{max_score}\n\
Marker comments:\n{comments}\n\
Output exactly these lines and nothing else, with no preamble or extra text:\n\
{lines}\
Score: {score:.2}/{max_score}\n\
Overall: <one sentence summary>\n",
        score = aggregated.scaled_score,
        max_score = aggregated.max_score,
    )
}

fn comment_or_placeholder(score: &CriterionScore) -> &str {
    if score.comment.is_empty() {
        "(no comment)"
    } else {
        &score.comment
    }
}
