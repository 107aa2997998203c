use serde::Serialize;

use crate::services::SettlementOutcome;

/// Acknowledgement body returned to the payment provider. Every understood
/// notification gets a 200 so the provider stops retrying; the body says
/// what was actually done with it.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WebhookAckResponse {
    outcome: &'static str,
}

impl From<&SettlementOutcome> for WebhookAckResponse {
    fn from(outcome: &SettlementOutcome) -> Self {
        let outcome = match outcome {
            SettlementOutcome::Paid { .. } => "paid",
            SettlementOutcome::Failed { .. } => "failed",
            SettlementOutcome::SoldOut => "sold_out",
            SettlementOutcome::Ignored => "ignored",
        };
        Self { outcome }
    }
}
