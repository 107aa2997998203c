use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{QuestionOutcome, QuizQuestion};

/// Question as served to clients. Built from [`QuizQuestion`], which keeps
/// the correct answer out of every serialisation path.
#[derive(Serialize, utoipa::ToSchema)]
pub struct QuizQuestionView {
    id: Uuid,
    section_label: String,
    question: String,
    options: Vec<String>,
    points: i32,
}

impl From<&QuizQuestion> for QuizQuestionView {
    fn from(q: &QuizQuestion) -> Self {
        Self {
            id: q.id(),
            section_label: q.section_label().to_string(),
            question: q.question().to_string(),
            options: q.options().to_vec(),
            points: q.points(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct QuizResponse {
    course_id: Uuid,
    questions: Vec<QuizQuestionView>,
}

impl QuizResponse {
    pub fn new(course_id: Uuid, questions: &[QuizQuestion]) -> Self {
        Self {
            course_id,
            questions: questions.iter().map(QuizQuestionView::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuizSubmissionBody {
    pub answers: Vec<SubmittedAnswerBody>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmittedAnswerBody {
    pub question_id: Uuid,
    pub selected_answer: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct QuizResultResponse {
    score: i32,
    total: i32,
    passed: bool,
    detail: Vec<QuestionOutcome>,
    certificate_sent: bool,
}

impl QuizResultResponse {
    pub fn new(
        score: i32,
        total: i32,
        passed: bool,
        detail: Vec<QuestionOutcome>,
        certificate_sent: bool,
    ) -> Self {
        Self {
            score,
            total,
            passed,
            detail,
            certificate_sent,
        }
    }
}
