//! Payment-provider settlement: turns a verified notification into durable
//! order and access-grant records.
//!
//! The provider delivers at-least-once; ownership grants use set semantics
//! so a replay is harmless, and order creation plus all grants happen inside
//! one transaction so a crash cannot leave an order without its access (or
//! the reverse).

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::model::entity::{
    CourseEnrollment, CourseSession, Order, OrderCreate, OrderItem, OrderItemKind, OrderStatus,
    PaymentAudit,
};
use crate::model::{DatabaseError, ModelManager};
use crate::services::mail::{Mailer, OutgoingEmail};
use crate::services::signature;

pub type SettlementResult<T> = std::result::Result<T, SettlementError>;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl PaymentStatus {
    fn parse(value: &str) -> Self {
        match value {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettlementNotification {
    pub status: PaymentStatus,
    pub reference: String,
    pub amount_cents: i64,
    pub buyer_email: String,
    pub buyer_name: String,
    pub user_id: Option<Uuid>,
    pub delivery_address: Option<String>,
    pub items: Vec<OrderItem>,
}

/// What the handler acknowledges back to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Access granted, paid order recorded.
    Paid { order_id: Uuid },
    /// Failed/cancelled payment recorded, nothing granted.
    Failed { order_id: Uuid },
    /// A session item could not be fulfilled (sold out); audited, nothing
    /// recorded.
    SoldOut,
    /// Non-terminal status; nothing to do.
    Ignored,
}

const MAX_ITEMS: usize = 50;

fn field<'a>(
    fields: &'a BTreeMap<String, String>,
    name: &str,
) -> SettlementResult<&'a str> {
    fields
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SettlementError::MalformedPayload(format!("missing field `{name}`")))
}

fn parse_i64(fields: &BTreeMap<String, String>, name: &str) -> SettlementResult<i64> {
    field(fields, name)?
        .parse()
        .map_err(|_| SettlementError::MalformedPayload(format!("field `{name}` is not a number")))
}

fn parse_uuid(value: &str, name: &str) -> SettlementResult<Uuid> {
    value
        .parse()
        .map_err(|_| SettlementError::MalformedPayload(format!("field `{name}` is not a uuid")))
}

impl SettlementNotification {
    /// Structural validation of the flat form fields. Does not touch the
    /// signature; callers verify that first.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> SettlementResult<Self> {
        let status = PaymentStatus::parse(field(fields, "payment_status")?);

        let reference = field(fields, "reference")?.to_string();
        let amount_cents = parse_i64(fields, "amount")?;
        let buyer_email = field(fields, "buyer_email")?.to_string();
        let buyer_name = field(fields, "buyer_name")?.to_string();
        let user_id = match fields.get("user_id").filter(|v| !v.is_empty()) {
            Some(v) => Some(parse_uuid(v, "user_id")?),
            None => None,
        };
        let delivery_address = fields.get("delivery_address").cloned().filter(|v| !v.is_empty());

        let item_count = parse_i64(fields, "item_count")? as usize;
        if item_count == 0 || item_count > MAX_ITEMS {
            return Err(SettlementError::MalformedPayload(format!(
                "item_count {item_count} out of range"
            )));
        }

        let mut items = Vec::with_capacity(item_count);
        for n in 1..=item_count {
            let kind_raw = field(fields, &format!("item_{n}_kind"))?;
            let kind = OrderItemKind::parse(kind_raw).ok_or_else(|| {
                SettlementError::MalformedPayload(format!("unknown item kind `{kind_raw}`"))
            })?;

            let quantity = parse_i64(fields, &format!("item_{n}_quantity"))?;
            if quantity < 1 {
                return Err(SettlementError::MalformedPayload(format!(
                    "item_{n}_quantity must be positive"
                )));
            }
            let unit_price_cents = parse_i64(fields, &format!("item_{n}_unit_price"))?;
            if unit_price_cents < 0 {
                return Err(SettlementError::MalformedPayload(format!(
                    "item_{n}_unit_price must not be negative"
                )));
            }
            let label = field(fields, &format!("item_{n}_label"))?.to_string();

            let course_id = match fields
                .get(&format!("item_{n}_course_id"))
                .filter(|v| !v.is_empty())
            {
                Some(v) => Some(parse_uuid(v, &format!("item_{n}_course_id"))?),
                None => None,
            };
            let session_id = match fields
                .get(&format!("item_{n}_session_id"))
                .filter(|v| !v.is_empty())
            {
                Some(v) => Some(parse_uuid(v, &format!("item_{n}_session_id"))?),
                None => None,
            };

            if matches!(kind, OrderItemKind::OnlineCourse | OrderItemKind::PresentialSession) {
                if course_id.is_none() {
                    return Err(SettlementError::MalformedPayload(format!(
                        "item_{n} requires a course_id"
                    )));
                }
                if user_id.is_none() {
                    return Err(SettlementError::MalformedPayload(String::from(
                        "course items require a user_id",
                    )));
                }
            }

            items.push(OrderItem {
                kind,
                course_id,
                session_id,
                label,
                quantity: quantity as i32,
                unit_price_cents,
            });
        }

        Ok(Self {
            status,
            reference,
            amount_cents,
            buyer_email,
            buyer_name,
            user_id,
            delivery_address,
            items,
        })
    }
}

/// Entry point for the webhook route. Structural validation, then the
/// signature; mutation only after both.
pub async fn process_notification(
    mm: &ModelManager,
    mailer: &Arc<dyn Mailer>,
    admin_email: &str,
    fields: &BTreeMap<String, String>,
    secret: &str,
) -> SettlementResult<SettlementOutcome> {
    let notification = SettlementNotification::from_fields(fields)?;

    if !signature::verify(fields, secret) {
        return Err(SettlementError::InvalidSignature);
    }

    match notification.status {
        PaymentStatus::Completed => settle_completed(mm, mailer, admin_email, fields, notification).await,
        PaymentStatus::Failed | PaymentStatus::Cancelled => {
            settle_failed(mm, fields, notification).await
        }
        PaymentStatus::Other(ref status) => {
            tracing::info!("ignoring payment notification with status `{status}`");
            Ok(SettlementOutcome::Ignored)
        }
    }
}

async fn settle_completed(
    mm: &ModelManager,
    mailer: &Arc<dyn Mailer>,
    admin_email: &str,
    fields: &BTreeMap<String, String>,
    notification: SettlementNotification,
) -> SettlementResult<SettlementOutcome> {
    let mut tx = mm.executor().begin().await?;
    let mut resolved_items = Vec::with_capacity(notification.items.len());

    for item in &notification.items {
        let mut item = item.clone();
        match item.kind {
            OrderItemKind::Product => {}
            OrderItemKind::OnlineCourse => {
                // from_fields guarantees both ids for course items
                let user_id = notification.user_id.expect("validated user_id");
                let course_id = item.course_id.expect("validated course_id");
                let inserted = CourseEnrollment::grant(&mut tx, user_id, course_id).await?;
                if !inserted {
                    tracing::debug!("user {user_id} already owns course {course_id}");
                }
            }
            OrderItemKind::PresentialSession => {
                let user_id = notification.user_id.expect("validated user_id");
                let course_id = item.course_id.expect("validated course_id");

                let session = match item.session_id {
                    Some(id) => CourseSession::find(&mut tx, id).await?,
                    None => {
                        // upstream checkout omits the session id for
                        // single-session courses; see DESIGN.md
                        tracing::warn!(
                            "notification {} has no session_id, falling back to first open session of course {course_id}",
                            notification.reference
                        );
                        CourseSession::first_open(&mut tx, course_id).await?
                    }
                };
                let Some(session) = session else {
                    return Err(SettlementError::MalformedPayload(format!(
                        "no bookable session for course {course_id}"
                    )));
                };

                let reserved =
                    CourseSession::reserve_seats(&mut tx, session.id(), item.quantity).await?;
                if !reserved {
                    tx.rollback().await?;
                    tracing::error!(
                        "session {} sold out while settling notification {}",
                        session.id(),
                        notification.reference
                    );
                    audit_payload(mm, fields).await?;
                    return Ok(SettlementOutcome::SoldOut);
                }
                CourseSession::add_participant(&mut tx, session.id(), user_id, item.quantity)
                    .await?;
                item.session_id = Some(session.id());
            }
        }
        resolved_items.push(item);
    }

    let order = Order::create(
        &mut tx,
        OrderCreate {
            user_id: notification.user_id,
            customer_email: notification.buyer_email.clone(),
            customer_name: notification.buyer_name.clone(),
            items: resolved_items,
            total_cents: notification.amount_cents,
            status: OrderStatus::Paid,
            delivery_address: notification.delivery_address.clone(),
            receipt: serde_json::json!({ "reference": notification.reference }),
        },
    )
    .await?;
    tx.commit().await?;

    // best effort after commit; a lost email never unwinds a paid order
    for email in [
        confirmation_email(&notification, order.id()),
        admin_email_for(&notification, order.id(), admin_email),
    ] {
        let to = email.to.clone();
        if let Err(e) = mailer.send(email).await {
            tracing::warn!("order notification email to {to} failed: {e}");
        }
    }

    Ok(SettlementOutcome::Paid { order_id: order.id() })
}

async fn settle_failed(
    mm: &ModelManager,
    fields: &BTreeMap<String, String>,
    notification: SettlementNotification,
) -> SettlementResult<SettlementOutcome> {
    let mut tx = mm.executor().begin().await?;

    let order = Order::create(
        &mut tx,
        OrderCreate {
            user_id: notification.user_id,
            customer_email: notification.buyer_email.clone(),
            customer_name: notification.buyer_name.clone(),
            items: notification.items.clone(),
            total_cents: notification.amount_cents,
            status: OrderStatus::Failed,
            delivery_address: notification.delivery_address.clone(),
            receipt: serde_json::json!({ "reference": notification.reference }),
        },
    )
    .await?;
    PaymentAudit::append(&mut tx, &serde_json::to_value(fields).map_err(DatabaseError::from)?)
        .await?;
    tx.commit().await?;

    Ok(SettlementOutcome::Failed { order_id: order.id() })
}

async fn audit_payload(
    mm: &ModelManager,
    fields: &BTreeMap<String, String>,
) -> SettlementResult<()> {
    let mut conn = mm.executor().acquire().await?;
    PaymentAudit::append(&mut conn, &serde_json::to_value(fields).map_err(DatabaseError::from)?)
        .await?;
    Ok(())
}

fn format_euros(cents: i64) -> String {
    format!("{},{:02} €", cents / 100, (cents % 100).abs())
}

fn confirmation_email(notification: &SettlementNotification, order_id: Uuid) -> OutgoingEmail {
    let lines: String = notification
        .items
        .iter()
        .map(|i| {
            format!(
                "<li>{} × {} — {}</li>",
                i.quantity,
                i.label,
                format_euros(i.unit_price_cents * i64::from(i.quantity))
            )
        })
        .collect();

    OutgoingEmail {
        to: notification.buyer_email.clone(),
        subject: format!("Confirmation de votre commande {order_id}"),
        html_body: format!(
            "<p>Bonjour {},</p><p>Nous avons bien reçu votre paiement de {}.</p><ul>{}</ul><p>Merci de votre confiance.</p>",
            notification.buyer_name,
            format_euros(notification.amount_cents),
            lines,
        ),
        attachment: None,
    }
}

fn admin_email_for(
    notification: &SettlementNotification,
    order_id: Uuid,
    admin: &str,
) -> OutgoingEmail {
    OutgoingEmail {
        to: admin.to_string(),
        subject: format!("Nouvelle commande {order_id}"),
        html_body: format!(
            "<p>Commande de {} ({}) — total {}.</p>",
            notification.buyer_name,
            notification.buyer_email,
            format_euros(notification.amount_cents),
        ),
        attachment: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn base_fields() -> BTreeMap<String, String> {
        BTreeMap::from(
            [
                ("payment_status", "completed"),
                ("reference", "pf-1842"),
                ("amount", "12900"),
                ("buyer_email", "client@ferme.example"),
                ("buyer_name", "Jeanne Dupont"),
                ("item_count", "1"),
                ("item_1_kind", "product"),
                ("item_1_label", "Semences de blé dur"),
                ("item_1_quantity", "2"),
                ("item_1_unit_price", "6450"),
            ]
            .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn parses_a_product_notification() {
        let n = SettlementNotification::from_fields(&base_fields()).unwrap();
        assert_eq!(n.status, PaymentStatus::Completed);
        assert_eq!(n.amount_cents, 12900);
        assert_eq!(n.items.len(), 1);
        assert_eq!(n.items[0].kind, OrderItemKind::Product);
        assert_eq!(n.items[0].quantity, 2);
    }

    #[test]
    fn missing_status_is_malformed() {
        let mut f = base_fields();
        f.remove("payment_status");
        assert!(matches!(
            SettlementNotification::from_fields(&f),
            Err(SettlementError::MalformedPayload(_))
        ));
    }

    #[test]
    fn non_numeric_amount_is_malformed() {
        let mut f = base_fields();
        f.insert(String::from("amount"), String::from("beaucoup"));
        assert!(matches!(
            SettlementNotification::from_fields(&f),
            Err(SettlementError::MalformedPayload(_))
        ));
    }

    #[test]
    fn unknown_item_kind_is_malformed() {
        let mut f = base_fields();
        f.insert(String::from("item_1_kind"), String::from("mystery"));
        assert!(matches!(
            SettlementNotification::from_fields(&f),
            Err(SettlementError::MalformedPayload(_))
        ));
    }

    #[test]
    fn course_item_without_user_is_malformed() {
        let mut f = base_fields();
        f.insert(String::from("item_1_kind"), String::from("online_course"));
        f.insert(String::from("item_1_course_id"), Uuid::new_v4().to_string());
        // no user_id
        assert!(matches!(
            SettlementNotification::from_fields(&f),
            Err(SettlementError::MalformedPayload(_))
        ));
    }

    #[test]
    fn unknown_status_parses_as_other() {
        let mut f = base_fields();
        f.insert(String::from("payment_status"), String::from("chargeback"));
        let n = SettlementNotification::from_fields(&f).unwrap();
        assert_eq!(n.status, PaymentStatus::Other(String::from("chargeback")));
    }

    #[test]
    fn euros_formatting() {
        assert_eq!(format_euros(12900), "129,00 €");
        assert_eq!(format_euros(105), "1,05 €");
    }
}
