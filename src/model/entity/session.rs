use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// A scheduled run of a presential course. `seats_left` is only ever touched
/// through the conditional decrement in `reserve_seats`, so it cannot go
/// negative even under concurrent settlements.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct CourseSession {
    id: Uuid,
    course_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    location: String,
    capacity: i32,
    seats_left: i32,
    status: String,
}

impl ResourceTyped for CourseSession {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::CourseSession
    }
}

impl CourseSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn seats_left(&self) -> i32 {
        self.seats_left
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM course_sessions WHERE course_id = $1 ORDER BY starts_at")
                .bind(course_id)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn find(conn: &mut PgConnection, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM course_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(result)
    }

    /// Earliest open session of a course, the fallback when a settlement
    /// item carries no explicit session id.
    pub async fn first_open(
        conn: &mut PgConnection,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT * FROM course_sessions
            WHERE course_id = $1 AND status = 'open'
            ORDER BY starts_at
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .fetch_optional(conn)
        .await?;
        Ok(result)
    }

    /// Atomically takes `quantity` seats iff enough are left. Returns false
    /// when the session is sold out (or short), mutating nothing.
    pub async fn reserve_seats(
        conn: &mut PgConnection,
        session_id: Uuid,
        quantity: i32,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE course_sessions
            SET seats_left = seats_left - $2
            WHERE id = $1 AND seats_left >= $2
            "#,
        )
        .bind(session_id)
        .bind(quantity)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Adds the user to the session's participant set (set semantics).
    pub async fn add_participant(
        conn: &mut PgConnection,
        session_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO session_participants (session_id, user_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id, user_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(quantity)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
