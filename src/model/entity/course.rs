use crate::impl_paginatable_for;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::Repository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Online courses are self-paced (lessons + quiz); presential ones are
/// scheduled sessions with limited seats. Gating and quizzes only apply to
/// the online kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourseKind {
    Online,
    Presential,
}

impl CourseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Presential => "presential",
        }
    }
}

impl From<&str> for CourseKind {
    fn from(value: &str) -> Self {
        match value {
            "presential" => Self::Presential,
            _ => Self::Online,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    title: String,
    description: String,
    kind: String,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> CourseKind {
        CourseKind::from(self.kind.as_str())
    }
}

#[async_trait]
impl Repository<Course, uuid::Uuid> for Course {
    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }

        Ok(Some(result?))
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses ORDER BY title LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Course, Uuid);

// Utils

/// A course's ordered sections with their ordered lessons, as fed to the
/// gating evaluator. Lesson ids are only unique within their section, which
/// is why progress keys are always `{section_id}-{lesson_id}` pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseStructure {
    pub course_id: Uuid,
    pub sections: Vec<SectionNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionNode {
    pub id: Uuid,
    pub title: String,
    pub lessons: Vec<LessonNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonNode {
    pub id: Uuid,
    pub title: String,
    pub video_url: Option<String>,
    pub duration_label: Option<String>,
}

impl CourseStructure {
    pub fn lesson_count(&self) -> usize {
        self.sections.iter().map(|s| s.lessons.len()).sum()
    }
}

#[derive(sqlx::FromRow)]
struct SectionWithLessonsRow {
    id: Uuid,
    title: String,
    lessons: serde_json::Value,
}

impl CourseStructure {
    pub async fn fetch(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let rows: Vec<SectionWithLessonsRow> = sqlx::query_as(
            r#"
            SELECT
            s.id,
            s.title,
            COALESCE(
                json_agg(
                    json_build_object(
                        'id', l.id,
                        'title', l.title,
                        'video_url', l.video_url,
                        'duration_label', l.duration_label
                    )
                    ORDER BY l.position
                ) FILTER (WHERE l.id IS NOT NULL),
                '[]'
            ) AS lessons
            FROM course_sections s
            LEFT JOIN lessons l ON l.section_id = s.id
            WHERE s.course_id = $1
            GROUP BY s.id
            ORDER BY s.position;
        "#,
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;

        let mut sections = Vec::with_capacity(rows.len());
        for row in rows {
            let lessons: Vec<LessonNode> = serde_json::from_value(row.lessons)?;
            sections.push(SectionNode {
                id: row.id,
                title: row.title,
                lessons,
            });
        }

        Ok(CourseStructure {
            course_id,
            sections,
        })
    }
}
