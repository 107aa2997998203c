use crate::model::repo::ResourceTyped;
use crate::model::error::DatabaseResult;
use sqlx::PgConnection;
use uuid::Uuid;

/// Raw provider payloads kept for reconciliation: failed / cancelled
/// notifications and sold-out rejections land here untouched.
pub struct PaymentAudit;

impl ResourceTyped for PaymentAudit {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::PaymentAudit
    }
}

impl PaymentAudit {
    pub async fn append(
        conn: &mut PgConnection,
        payload: &serde_json::Value,
    ) -> DatabaseResult<()> {
        sqlx::query("INSERT INTO payment_audit (id, payload, received_at) VALUES ($1, $2, now())")
            .bind(Uuid::new_v4())
            .bind(payload)
            .execute(conn)
            .await?;
        Ok(())
    }
}
