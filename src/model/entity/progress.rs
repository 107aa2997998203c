use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Per (user, course) set of completed `{section_id}-{lesson_id}` keys.
/// Created lazily on the first toggle; the whole set is replaced on update,
/// last write wins.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct CourseProgress {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    completed_keys: Vec<String>,
    last_accessed: DateTime<Utc>,
}

impl ResourceTyped for CourseProgress {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::CourseProgress
    }
}

impl CourseProgress {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn completed_keys(&self) -> &[String] {
        &self.completed_keys
    }

    pub fn into_completed_keys(self) -> Vec<String> {
        self.completed_keys
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    pub async fn find(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM course_progress WHERE user_id = $1 AND course_id = $2")
                .bind(actor.user_id())
                .bind(course_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    /// Replaces the completed set wholesale and bumps `last_accessed`.
    pub async fn replace(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
        completed_keys: Vec<String>,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO course_progress (id, user_id, course_id, completed_keys, last_accessed)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (user_id, course_id)
            DO UPDATE SET completed_keys = EXCLUDED.completed_keys, last_accessed = now()
            RETURNING id, user_id, course_id, completed_keys, last_accessed
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(course_id)
        .bind(&completed_keys)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}
