use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use sqlx::PgConnection;
use uuid::Uuid;

/// Membership in a course's owner set. Pure set semantics: granting twice is
/// a no-op, which is what makes duplicate settlement notifications safe.
pub struct CourseEnrollment;

impl ResourceTyped for CourseEnrollment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Enrollment
    }
}

impl CourseEnrollment {
    pub async fn exists(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM course_enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(found > 0)
    }

    /// Returns whether a new enrollment was actually inserted.
    pub async fn grant(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO course_enrollments (user_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
