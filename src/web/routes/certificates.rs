use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use uuid::Uuid;

use crate::{
    model::{
        Repository, ResourceTyped,
        entity::{Course, QuizResult, UserEntity},
    },
    services::mail::{EmailAttachment, OutgoingEmail},
    web::{
        AppState, RequestContext, WebError, WebResult,
        error::{ErrorResponse, WorkflowError},
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/{course_id}/resend", post(certificate_resend_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Renders the certificate for a passing result and emails it as a PDF
/// attachment. Shared by the on-pass path (where a failure is only logged)
/// and the resend route (where it is surfaced).
pub(crate) async fn issue_and_send(
    state: &AppState,
    recipient: &UserEntity,
    course_title: &str,
    completion_date: chrono::NaiveDate,
) -> Result<(), WorkflowError> {
    let pdf = state
        .certificates()
        .issue(&recipient.full_name(), course_title, completion_date)?;

    let email = OutgoingEmail {
        to: recipient.email().to_string(),
        subject: format!("Votre certificat — {course_title}"),
        html_body: format!(
            "<p>Bonjour {},</p><p>Félicitations ! Vous avez réussi le quiz de la formation « {} ». Votre certificat est joint à ce message.</p>",
            recipient.first_name(),
            course_title,
        ),
        attachment: Some(EmailAttachment {
            filename: String::from("certificat.pdf"),
            content_type: String::from("application/pdf"),
            bytes: pdf,
        }),
    };

    state.mailer().send(email).await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/certificates/{course_id}/resend",
    description = "Regenerates and re-sends the caller's certificate",
    responses(
        (status = 200, description = "Certificate sent"),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 409, description = "No passing quiz result yet", body = ErrorResponse),
        (status = 502, description = "Certificate could not be delivered", body = ErrorResponse),
    ),
    tag = "certificates",
    security(
        ("cookie" = [])
    )
)]
pub(crate) async fn certificate_resend_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let result = QuizResult::find_passing(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizResult::get_resource_type(), e))?
        .ok_or(WorkflowError::NotPassedYet)?;

    let course = Course::find_by_id(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    let recipient = UserEntity::find_by_id(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

    // unlike the on-pass path, a failed send here is the caller's answer
    issue_and_send(
        &state,
        &recipient,
        course.title(),
        result.attempted_at().date_naive(),
    )
    .await?;

    result
        .mark_certificate_sent(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizResult::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "sent": true }))))
}
