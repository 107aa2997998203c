use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::entity::{Course, CourseSession, CourseStructure};
use crate::services::gating;

#[derive(Serialize, utoipa::ToSchema)]
pub struct CourseSummaryResponse {
    id: Uuid,
    title: String,
    description: String,
    kind: String,
}

impl From<&Course> for CourseSummaryResponse {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id(),
            title: course.title().to_string(),
            description: course.description().to_string(),
            kind: course.kind().as_str().to_string(),
        }
    }
}

/// Catalogue detail with per-lesson unlock state for the requesting user.
/// Locked lessons keep their title but hide the video url.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CourseDetailResponse {
    id: Uuid,
    title: String,
    description: String,
    kind: String,
    enrolled: bool,
    completed_count: usize,
    lesson_count: usize,
    sections: Vec<SectionView>,
    sessions: Vec<SessionView>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SectionView {
    id: Uuid,
    title: String,
    accessible: bool,
    lessons: Vec<LessonView>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LessonView {
    id: Uuid,
    title: String,
    video_url: Option<String>,
    duration_label: Option<String>,
    accessible: bool,
    completed: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionView {
    id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    location: String,
    seats_left: i32,
    status: String,
}

impl From<&CourseSession> for SessionView {
    fn from(session: &CourseSession) -> Self {
        Self {
            id: session.id(),
            starts_at: session.starts_at(),
            ends_at: session.ends_at(),
            location: session.location().to_string(),
            seats_left: session.seats_left(),
            status: session.status().to_string(),
        }
    }
}

impl CourseDetailResponse {
    pub fn build(
        course: &Course,
        structure: &CourseStructure,
        sessions: &[CourseSession],
        completed: &HashSet<String>,
        enrolled: bool,
    ) -> Self {
        let sections = structure
            .sections
            .iter()
            .map(|section| {
                let accessible =
                    enrolled && gating::can_access_section(structure, completed, section.id);
                let lessons = section
                    .lessons
                    .iter()
                    .map(|lesson| {
                        let lesson_accessible = enrolled
                            && gating::can_access_lesson(
                                structure, completed, section.id, lesson.id,
                            );
                        LessonView {
                            id: lesson.id,
                            title: lesson.title.clone(),
                            video_url: lesson_accessible.then(|| lesson.video_url.clone()).flatten(),
                            duration_label: lesson.duration_label.clone(),
                            accessible: lesson_accessible,
                            completed: completed
                                .contains(&gating::lesson_key(section.id, lesson.id)),
                        }
                    })
                    .collect();

                SectionView {
                    id: section.id,
                    title: section.title.clone(),
                    accessible,
                    lessons,
                }
            })
            .collect();

        Self {
            id: course.id(),
            title: course.title().to_string(),
            description: course.description().to_string(),
            kind: course.kind().as_str().to_string(),
            enrolled,
            completed_count: gating::completed_count(structure, completed),
            lesson_count: structure.lesson_count(),
            sections,
            sessions: sessions.iter().map(SessionView::from).collect(),
        }
    }
}
