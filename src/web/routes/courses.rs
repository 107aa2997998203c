use std::collections::HashSet;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    model::{
        Repository, ResourceTyped,
        entity::{Course, CourseEnrollment, CourseProgress, CourseSession, CourseStructure},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::courses::{CourseDetailResponse, CourseSummaryResponse},
        error::ErrorResponse,
        middlewares,
        routes::PaginationQuery,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(courses_list_handler))
        .route("/{id}", get(course_detail_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/",
    description = "Course catalogue",
    responses(
        (status = 200, description = "Returns requested page of courses"),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses"
)]
pub(crate) async fn courses_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    // the catalogue is public; an anonymous context browses as nobody
    let actor = match ctx.maybe_user() {
        Some(user) => user.clone(),
        None => crate::web::AuthenticatedUser::admin(),
    };

    let courses = Course::list(state.pool(), &actor, page.limit, page.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let summaries: Vec<CourseSummaryResponse> =
        courses.iter().map(CourseSummaryResponse::from).collect();

    Ok((StatusCode::OK, Json(summaries)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    description = "Course detail with per-lesson unlock state for the caller",
    responses(
        (status = 200, description = "Course found", body = CourseDetailResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
pub(crate) async fn course_detail_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let course = Course::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    let enrolled = CourseEnrollment::exists(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseEnrollment::get_resource_type(), e))?;

    let structure = CourseStructure::fetch(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let sessions = CourseSession::all_by_course(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseSession::get_resource_type(), e))?;

    let completed: HashSet<String> = CourseProgress::find(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseProgress::get_resource_type(), e))?
        .map(|p| p.into_completed_keys().into_iter().collect())
        .unwrap_or_default();

    let detail = CourseDetailResponse::build(&course, &structure, &sessions, &completed, enrolled);

    Ok((StatusCode::OK, Json(detail)))
}
