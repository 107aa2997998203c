use crate::model::repo::ResourceTyped;
use crate::model::error::DatabaseResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Cart line kinds are an explicit discriminant set at creation time, never
/// inferred from payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemKind {
    Product,
    OnlineCourse,
    PresentialSession,
}

impl OrderItemKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "product" => Some(Self::Product),
            "online_course" => Some(Self::OnlineCourse),
            "presential_session" => Some(Self::PresentialSession),
            _ => None,
        }
    }
}

/// A purchased line, with the unit price captured at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OrderItem {
    pub kind: OrderItemKind,
    pub course_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub label: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Paid,
    Pending,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }
}

/// One row per terminal settlement notification; immutable after insert.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Order {
    id: Uuid,
    user_id: Option<Uuid>,
    customer_email: String,
    customer_name: String,
    items: serde_json::Value,
    total_cents: i64,
    status: String,
    delivery_address: Option<String>,
    receipt: serde_json::Value,
    created_at: DateTime<Utc>,
}

pub struct OrderCreate {
    pub user_id: Option<Uuid>,
    pub customer_email: String,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub delivery_address: Option<String>,
    pub receipt: serde_json::Value,
}

impl ResourceTyped for Order {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Order
    }
}

impl Order {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn items(&self) -> DatabaseResult<Vec<OrderItem>> {
        let items = serde_json::from_value(self.items.clone())?;
        Ok(items)
    }

    pub fn total_cents(&self) -> i64 {
        self.total_cents
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn create(conn: &mut PgConnection, data: OrderCreate) -> DatabaseResult<Self> {
        let items = serde_json::to_value(&data.items)?;
        let row = sqlx::query_as(
            r#"
            INSERT INTO orders
                (id, user_id, customer_email, customer_name, items, total_cents, status,
                 delivery_address, receipt, created_at)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9, now())
            RETURNING id, user_id, customer_email, customer_name, items, total_cents, status,
                      delivery_address, receipt, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(&data.customer_email)
        .bind(&data.customer_name)
        .bind(items)
        .bind(data.total_cents)
        .bind(data.status.as_str())
        .bind(&data.delivery_address)
        .bind(&data.receipt)
        .fetch_one(conn)
        .await?;

        Ok(row)
    }
}
