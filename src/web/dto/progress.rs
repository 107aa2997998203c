use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ProgressUpdateBody {
    /// Full replacement set of completed `{section_id}-{lesson_id}` keys.
    pub completed_keys: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProgressResponse {
    course_id: Uuid,
    completed_keys: Vec<String>,
    completed_count: usize,
    total_lessons: usize,
    last_accessed: Option<DateTime<Utc>>,
}

impl ProgressResponse {
    pub fn new(
        course_id: Uuid,
        completed_keys: Vec<String>,
        completed_count: usize,
        total_lessons: usize,
        last_accessed: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            course_id,
            completed_keys,
            completed_count,
            total_lessons,
            last_accessed,
        }
    }
}
