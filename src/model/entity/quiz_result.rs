use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// One quiz attempt. The `detail` column records per-question correctness
/// only — never the expected answers, so a failed attempt leaks nothing.
/// A partial unique index on (user_id, course_id) WHERE passed guarantees at
/// most one passing row per pair.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizResult {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    score: i32,
    total: i32,
    passed: bool,
    detail: serde_json::Value,
    attempted_at: DateTime<Utc>,
    certificate_sent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuestionOutcome {
    pub question_id: Uuid,
    pub correct: bool,
}

pub struct QuizResultCreate {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub score: i32,
    pub total: i32,
    pub passed: bool,
    pub detail: Vec<QuestionOutcome>,
}

impl ResourceTyped for QuizResult {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuizResult
    }
}

impl QuizResult {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn detail(&self) -> DatabaseResult<Vec<QuestionOutcome>> {
        let detail = serde_json::from_value(self.detail.clone())?;
        Ok(detail)
    }

    pub fn attempted_at(&self) -> DateTime<Utc> {
        self.attempted_at
    }

    pub fn certificate_sent(&self) -> bool {
        self.certificate_sent
    }

    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizResultCreate,
    ) -> DatabaseResult<Self> {
        let detail = serde_json::to_value(&data.detail)?;
        let row = sqlx::query_as(
            r#"
            INSERT INTO quiz_results
                (id, user_id, course_id, score, total, passed, detail, attempted_at, certificate_sent)
            VALUES ($1,$2,$3,$4,$5,$6,$7, now(), FALSE)
            RETURNING id, user_id, course_id, score, total, passed, detail, attempted_at, certificate_sent
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.course_id)
        .bind(data.score)
        .bind(data.total)
        .bind(data.passed)
        .bind(detail)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn find_passing(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM quiz_results WHERE user_id = $1 AND course_id = $2 AND passed",
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    /// Attempts made since midnight UTC, the quota's calendar-day boundary.
    pub async fn count_today(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM quiz_results
            WHERE user_id = $1 AND course_id = $2
              AND attempted_at >= date_trunc('day', now() AT TIME ZONE 'utc') AT TIME ZONE 'utc'
            "#,
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(count)
    }

    pub async fn mark_certificate_sent(&self, mm: &ModelManager) -> DatabaseResult<()> {
        sqlx::query("UPDATE quiz_results SET certificate_sent = TRUE WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }
}
