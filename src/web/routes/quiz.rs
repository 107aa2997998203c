use std::collections::HashSet;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        Repository, ResourceTyped,
        entity::{
            Course, CourseEnrollment, CourseProgress, CourseStructure, QuizQuestion, QuizResult,
            QuizResultCreate, UserEntity,
        },
    },
    services::{
        gating,
        grading::{self, DAILY_ATTEMPT_QUOTA, SubmittedAnswer},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::quiz::{QuizResponse, QuizResultResponse, QuizSubmissionBody},
        error::{ErrorResponse, WorkflowError},
        middlewares,
        routes::certificates,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/{course_id}", get(quiz_get_handler))
        .route("/{course_id}/submit", post(quiz_submit_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/quiz/{course_id}",
    description = "Quiz questions of a course, without the answer key",
    responses(
        (status = 200, description = "Questions found", body = QuizResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(
        ("cookie" = [])
    )
)]
pub(crate) async fn quiz_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let enrolled = CourseEnrollment::exists(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseEnrollment::get_resource_type(), e))?;
    if !enrolled {
        return Err(WorkflowError::NotEnrolled.into());
    }

    let questions = QuizQuestion::all_by_course(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizQuestion::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(QuizResponse::new(course_id, &questions))))
}

#[utoipa::path(
    post,
    path = "/api/v1/quiz/{course_id}/submit",
    description = "Grades a quiz submission; issues the certificate on pass",
    request_body = QuizSubmissionBody,
    responses(
        (status = 200, description = "Submission graded", body = QuizResultResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 409, description = "Already passed, or lessons incomplete", body = ErrorResponse),
        (status = 429, description = "Daily attempt quota exhausted", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(
        ("cookie" = [])
    )
)]
pub(crate) async fn quiz_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<QuizSubmissionBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    // preconditions, in order, each short-circuiting
    let enrolled = CourseEnrollment::exists(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseEnrollment::get_resource_type(), e))?;
    if !enrolled {
        return Err(WorkflowError::NotEnrolled.into());
    }

    if payload.answers.is_empty() {
        return Err(WorkflowError::EmptySubmission.into());
    }

    let passing = QuizResult::find_passing(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizResult::get_resource_type(), e))?;
    if passing.is_some() {
        return Err(WorkflowError::AlreadyPassed.into());
    }

    let attempts_today = QuizResult::count_today(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizResult::get_resource_type(), e))?;
    if attempts_today >= DAILY_ATTEMPT_QUOTA {
        return Err(WorkflowError::QuotaExceeded.into());
    }

    let structure = CourseStructure::fetch(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    let completed: HashSet<String> = CourseProgress::find(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseProgress::get_resource_type(), e))?
        .map(|p| p.into_completed_keys().into_iter().collect())
        .unwrap_or_default();
    if gating::completed_count(&structure, &completed) < structure.lesson_count() {
        return Err(WorkflowError::IncompleteCourse.into());
    }

    let questions = QuizQuestion::all_by_course(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizQuestion::get_resource_type(), e))?;

    let answers: Vec<SubmittedAnswer> = payload
        .answers
        .into_iter()
        .map(|a| SubmittedAnswer {
            question_id: a.question_id,
            selected_answer: a.selected_answer,
        })
        .collect();

    let key = grading::answer_key(&questions);
    let outcome = grading::grade(&key, &answers);

    let result = QuizResult::create(
        state.pool(),
        user,
        QuizResultCreate {
            user_id: user.user_id(),
            course_id,
            score: outcome.score,
            total: outcome.total,
            passed: outcome.passed,
            detail: outcome.detail.clone(),
        },
    )
    .await
    .map_err(|e| {
        // a concurrent pass trips the partial unique index
        if e.is_unique_violation() {
            WebError::from(WorkflowError::AlreadyPassed)
        } else {
            WebError::resource_fetch_error(QuizResult::get_resource_type(), e)
        }
    })?;

    let mut certificate_sent = false;
    if outcome.passed {
        let course = Course::find_by_id(state.pool(), user, course_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
            .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;
        let recipient = UserEntity::find_by_id(state.pool(), user, user.user_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
            .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

        // the pass already happened; a lost email is recoverable via resend
        match certificates::issue_and_send(
            &state,
            &recipient,
            course.title(),
            chrono::Utc::now().date_naive(),
        )
        .await
        {
            Ok(()) => {
                result
                    .mark_certificate_sent(state.pool())
                    .await
                    .map_err(|e| {
                        WebError::resource_fetch_error(QuizResult::get_resource_type(), e)
                    })?;
                certificate_sent = true;
            }
            Err(e) => {
                tracing::warn!("certificate delivery for course {course_id} failed: {e}");
            }
        }
    }

    let res = QuizResultResponse::new(
        outcome.score,
        outcome.total,
        outcome.passed,
        outcome.detail,
        certificate_sent,
    );

    Ok((StatusCode::OK, Json(res)))
}
