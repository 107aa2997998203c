use std::sync::Arc;

use crate::model::ModelManager;
use crate::services::certificate::CertificateIssuer;
use crate::services::mail::Mailer;

#[derive(Clone)]
pub struct AppState {
    mm: ModelManager,
    mailer: Arc<dyn Mailer>,
    certificates: Arc<CertificateIssuer>,
}

impl AppState {
    pub fn new(
        mm: ModelManager,
        mailer: Arc<dyn Mailer>,
        certificates: Arc<CertificateIssuer>,
    ) -> Self {
        Self {
            mm,
            mailer,
            certificates,
        }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn mailer(&self) -> &Arc<dyn Mailer> {
        &self.mailer
    }

    pub fn certificates(&self) -> &CertificateIssuer {
        &self.certificates
    }
}
