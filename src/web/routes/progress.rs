use std::collections::HashSet;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    model::{
        ResourceTyped,
        entity::{CourseEnrollment, CourseProgress, CourseStructure},
    },
    services::gating,
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::progress::{ProgressResponse, ProgressUpdateBody},
        error::{ErrorResponse, WorkflowError},
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/{course_id}",
            get(progress_get_handler).put(progress_put_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/{course_id}",
    description = "Completed lessons of the caller for one course",
    responses(
        (status = 200, description = "Progress found", body = ProgressResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
pub(crate) async fn progress_get_handler(
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

    let structure = CourseStructure::fetch(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseProgress::get_resource_type(), e))?;

    let progress = CourseProgress::find(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseProgress::get_resource_type(), e))?;

    // an absent row is an empty completed set, not an error
    let (keys, last_accessed) = match progress {
        Some(p) => {
            let last = p.last_accessed();
            (p.into_completed_keys(), Some(last))
        }
        None => (Vec::new(), None),
    };

    let completed: HashSet<String> = keys.iter().cloned().collect();
    let res = ProgressResponse::new(
        course_id,
        keys,
        gating::completed_count(&structure, &completed),
        structure.lesson_count(),
        last_accessed,
    );

    Ok((StatusCode::OK, Json(res)))
}

#[utoipa::path(
    put,
    path = "/api/v1/progress/{course_id}",
    description = "Replaces the caller's completed-lesson set for one course",
    request_body = ProgressUpdateBody,
    responses(
        (status = 200, description = "Progress replaced", body = ProgressResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
pub(crate) async fn progress_put_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<ProgressUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let enrolled = CourseEnrollment::exists(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseEnrollment::get_resource_type(), e))?;
    if !enrolled {
        return Err(WorkflowError::NotEnrolled.into());
    }

    let structure = CourseStructure::fetch(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseProgress::get_resource_type(), e))?;

    // stray keys can never unlock anything, drop them on write
    let keys = gating::retain_known_keys(&structure, payload.completed_keys);

    let saved = CourseProgress::replace(state.pool(), user, course_id, keys)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseProgress::get_resource_type(), e))?;

    let last_accessed = saved.last_accessed();
    let keys = saved.into_completed_keys();
    let completed: HashSet<String> = keys.iter().cloned().collect();

    let res = ProgressResponse::new(
        course_id,
        keys,
        gating::completed_count(&structure, &completed),
        structure.lesson_count(),
        Some(last_accessed),
    );

    Ok((StatusCode::OK, Json(res)))
}
