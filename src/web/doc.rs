use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct CookieAuthModifier;

impl Modify for CookieAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::user::user_signup_handler,
        crate::web::routes::user::user_signin_handler,
        crate::web::routes::user::user_me_handler,
        crate::web::routes::user::user_list_handler,
        crate::web::routes::courses::courses_list_handler,
        crate::web::routes::courses::course_detail_handler,
        crate::web::routes::progress::progress_get_handler,
        crate::web::routes::progress::progress_put_handler,
        crate::web::routes::quiz::quiz_get_handler,
        crate::web::routes::quiz::quiz_submit_handler,
        crate::web::routes::certificates::certificate_resend_handler,
        crate::web::routes::payments::payment_notify_handler,
    ),
    modifiers(&CookieAuthModifier),
)]
pub struct ApiDoc;
