use std::collections::BTreeMap;

use axum::{
    Form, Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post,
};

use crate::{
    Config,
    services::settlement::{self, SettlementOutcome},
    web::{AppState, WebResult, dto::payments::WebhookAckResponse, error::ErrorResponse},
};

pub fn routes<S>(state: AppState) -> Router<S> {
    // provider-to-server, authenticated by the HMAC signature, not a cookie
    Router::new()
        .route("/notify", post(payment_notify_handler))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/notify",
    description = "Settlement notifications from the payment provider",
    responses(
        (status = 200, description = "Notification processed", body = WebhookAckResponse),
        (status = 400, description = "Malformed payload or bad signature", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "payments"
)]
pub(crate) async fn payment_notify_handler(
    State(state): State<AppState>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> WebResult<impl IntoResponse> {
    let secret = Config::get_or_init(false).await.payment().webhook_secret();
    let admin_email = Config::get_or_init(false).await.smtp().admin();

    let outcome =
        settlement::process_notification(state.pool(), state.mailer(), admin_email, &fields, secret)
            .await?;

    if let SettlementOutcome::SoldOut = outcome {
        tracing::error!("settlement acknowledged without fulfilment: session sold out");
    }

    Ok((StatusCode::OK, Json(WebhookAckResponse::from(&outcome))))
}
