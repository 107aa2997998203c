use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{
    auth::CryptError,
    error::log_error,
    model::{DatabaseError, ResourceType},
    services::{CertificateError, MailError, SettlementError},
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUserConflict")]
    RegistrationUserConflict,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationCookieNotFound, cookie: {cookie}")]
    AuthenticationCookieNotFound { cookie: String },

    #[error("AuthenticationCookieInvalid, cookie: {cookie}. Error: {error}")]
    AuthenticationCookieInvalid {
        cookie: String,
        error: jsonwebtoken::errors::Error,
    },

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}")]
    ResourceForbidden { resource_type: ResourceType },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },

    #[error("ResourceBadRequest: {resource_type:?}")]
    ResourceBadRequest { resource_type: ResourceType },
}

/// Business-rule rejections of the learning workflow. Client messages are
/// French, like the rest of the user-facing surface.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("WorkflowNotEnrolled")]
    NotEnrolled,

    #[error("WorkflowIncompleteCourse")]
    IncompleteCourse,

    #[error("WorkflowAlreadyPassed")]
    AlreadyPassed,

    #[error("WorkflowQuotaExceeded")]
    QuotaExceeded,

    #[error("WorkflowNotPassedYet")]
    NotPassedYet,

    #[error("WorkflowEmptySubmission")]
    EmptySubmission,

    #[error("WorkflowCertificateRender: {0}")]
    CertificateRender(#[from] CertificateError),

    #[error("WorkflowCertificateDelivery: {0}")]
    CertificateDelivery(#[from] MailError),
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("PaymentMalformedPayload: {detail}")]
    MalformedPayload { detail: String },

    #[error("PaymentInvalidSignature")]
    InvalidSignature,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] crate::auth::CryptError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn client_display(&self) -> String {
        String::from("Erreur interne du serveur.")
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistrationUserConflict => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUserConflict => {
                String::from("Un compte existe déjà avec cette adresse e-mail.")
            }
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::AuthenticationCookieNotFound { .. } => StatusCode::NOT_FOUND,
            Self::AuthenticationInvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AuthenticationCookieInvalid { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationCookieInvalid { .. } => {
                String::from("Session invalide, veuillez vous reconnecter.")
            }
            Self::AuthenticationCookieNotFound { .. } => {
                String::from("Session introuvable, veuillez vous connecter.")
            }
            Self::AuthenticationRequired => String::from("Authentification requise."),
            Self::AuthenticationInvalidCredentials => {
                String::from("Adresse e-mail ou mot de passe incorrect.")
            }
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceBadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { .. } => String::from("Ressource introuvable."),
            Self::ResourceForbidden { .. } => String::from("Accès refusé à cette ressource."),
            Self::ResourceFetchError { .. } => {
                String::from("Impossible de récupérer la ressource.")
            }
            Self::ResourceBadRequest { .. } => String::from("Requête invalide."),
        }
    }
}

impl WorkflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotEnrolled => StatusCode::FORBIDDEN,
            Self::IncompleteCourse => StatusCode::CONFLICT,
            Self::AlreadyPassed => StatusCode::CONFLICT,
            Self::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::NotPassedYet => StatusCode::CONFLICT,
            Self::EmptySubmission => StatusCode::BAD_REQUEST,
            Self::CertificateRender(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CertificateDelivery(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::NotEnrolled => String::from("Vous n'êtes pas inscrit à cette formation."),
            Self::IncompleteCourse => {
                String::from("Veuillez terminer toutes les leçons avant de passer le quiz.")
            }
            Self::AlreadyPassed => String::from(
                "Vous avez déjà réussi ce quiz. Votre certificat vous a été envoyé par e-mail.",
            ),
            Self::QuotaExceeded => String::from(
                "Nombre maximal de tentatives atteint pour aujourd'hui. Réessayez demain.",
            ),
            Self::NotPassedYet => String::from(
                "Vous devez d'abord réussir le quiz pour recevoir votre certificat.",
            ),
            Self::EmptySubmission => String::from("Veuillez répondre au moins à une question."),
            Self::CertificateRender(_) => {
                String::from("La génération du certificat a échoué. Veuillez réessayer plus tard.")
            }
            Self::CertificateDelivery(_) => {
                String::from("L'envoi du certificat a échoué. Veuillez réessayer plus tard.")
            }
        }
    }
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::MalformedPayload { .. } => String::from("Notification de paiement invalide."),
            Self::InvalidSignature => String::from("Signature de la notification invalide."),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("WorkflowError - {0}")]
    WorkflowError(#[from] WorkflowError),
    #[error("PaymentError - {0}")]
    PaymentError(#[from] PaymentError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
        })
    }

    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        Self::ResourceError(ResourceError::ResourceFetchError {
            resource_type: r#type,
            error,
        })
    }

    pub fn resource_bad_request(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceBadRequest {
            resource_type: r#type,
        })
    }

    pub fn auth_cookie_not_found<S: Into<String>>(cookie: S) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationCookieNotFound {
            cookie: cookie.into(),
        })
    }

    pub fn auth_cookie_invalid<S: Into<String>>(
        cookie: S,
        error: jsonwebtoken::errors::Error,
    ) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationCookieInvalid {
            cookie: cookie.into(),
            error,
        })
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn registration_conflict() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUserConflict)
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::WorkflowError(e) => e.status_code(),
            Self::PaymentError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::WorkflowError(e) => e.client_display(),
            Self::PaymentError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }
}

impl From<SettlementError> for WebError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::MalformedPayload(detail) => {
                Self::PaymentError(PaymentError::MalformedPayload { detail })
            }
            SettlementError::InvalidSignature => {
                Self::PaymentError(PaymentError::InvalidSignature)
            }
            SettlementError::DatabaseError(error) => Self::ResourceError(
                ResourceError::ResourceFetchError {
                    resource_type: ResourceType::Order,
                    error,
                },
            ),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message for the client
    pub message: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Optional debug details (only in debug mode)
    pub details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        log_error(&self);

        let status_code = self.status_code();
        let display = self.client_display();

        let body = ErrorResponse {
            message: display,
            status_code: status_code.as_str().to_string(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        };

        (status_code, Json(body)).into_response()
    }
}
