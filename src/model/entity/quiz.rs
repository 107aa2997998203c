use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// One question of an online course's quiz. `correct_answer` is the
/// authoritative key and must never be serialized towards clients; the
/// grading service reads it, the quiz DTO drops it.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizQuestion {
    id: Uuid,
    course_id: Uuid,
    section_label: String,
    position: i32,
    question: String,
    options: Vec<String>,
    #[serde(skip)]
    correct_answer: String,
    points: i32,
}

impl ResourceTyped for QuizQuestion {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuizQuestion
    }
}

impl QuizQuestion {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn section_label(&self) -> &str {
        &self.section_label
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn points(&self) -> i32 {
        self.points
    }

    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM quiz_questions WHERE course_id = $1 ORDER BY section_label, position",
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}
