mod common;

use std::collections::BTreeMap;

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::{
    seed_course, seed_session, setup_server, setup_test_db, signed_payment_fields, signup_user,
};

fn base_fields(pairs: &[(&str, String)]) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = [
        ("payment_status", "completed"),
        ("reference", "pf-0001"),
        ("amount", "12900"),
        ("buyer_email", "client@ferme.example"),
        ("buyer_name", "Jeanne Dupont"),
        ("item_count", "1"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in pairs {
        fields.insert(k.to_string(), v.clone());
    }
    fields
}

fn product_item(fields: &mut BTreeMap<String, String>) {
    fields.insert("item_1_kind".into(), "product".into());
    fields.insert("item_1_label".into(), "Semences de blé dur".into());
    fields.insert("item_1_quantity".into(), "2".into());
    fields.insert("item_1_unit_price".into(), "6450".into());
}

async fn orders_with_status(pool: &sqlx::PgPool, status: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn tampered_signature_is_rejected_without_side_effects() {
    let db = setup_test_db().await;
    let (server, mailer) = setup_server(&db).await;

    let mut fields = base_fields(&[]);
    product_item(&mut fields);
    let mut fields = signed_payment_fields(fields).await;
    fields.insert("amount".into(), "1".into()); // tamper after signing

    let resp = server.post("/api/v1/payments/notify").form(&fields).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Signature de la notification invalide.");

    assert_eq!(orders_with_status(&db.pool, "paid").await, 0);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let db = setup_test_db().await;
    let (server, _mailer) = setup_server(&db).await;

    let mut fields = base_fields(&[]);
    product_item(&mut fields);

    let resp = server.post("/api/v1/payments/notify").form(&fields).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_product_payment_creates_paid_order_and_emails() {
    let db = setup_test_db().await;
    let (server, mailer) = setup_server(&db).await;

    let mut fields = base_fields(&[]);
    product_item(&mut fields);
    fields.insert("delivery_address".into(), "12 rue des Champs, Aurillac".into());
    let fields = signed_payment_fields(fields).await;

    let resp = server.post("/api/v1/payments/notify").form(&fields).await;
    resp.assert_status(StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["outcome"], "paid");

    assert_eq!(orders_with_status(&db.pool, "paid").await, 1);

    // customer confirmation then admin notification
    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "client@ferme.example");
    assert_eq!(sent[1].to, "commandes@agrilearn.example");
    assert!(sent[0].html_body.contains("129,00 €"));
}

#[tokio::test]
async fn duplicate_course_notification_grants_once() {
    let db = setup_test_db().await;
    let (mut server, _mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "buyer@test.example").await;
    let course_id = seed_course(&db.pool, "Élevage caprin", "online").await;

    let mut fields = base_fields(&[("user_id", user_id.to_string())]);
    fields.insert("item_1_kind".into(), "online_course".into());
    fields.insert("item_1_course_id".into(), course_id.to_string());
    fields.insert("item_1_label".into(), "Élevage caprin".into());
    fields.insert("item_1_quantity".into(), "1".into());
    fields.insert("item_1_unit_price".into(), "12900".into());
    let fields = signed_payment_fields(fields).await;

    // the provider delivers at-least-once
    for _ in 0..2 {
        server
            .post("/api/v1/payments/notify")
            .form(&fields)
            .await
            .assert_status(StatusCode::OK);
    }

    let enrollments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM course_enrollments WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(enrollments, 1);
    // each notification still records its own order
    assert_eq!(orders_with_status(&db.pool, "paid").await, 2);
}

#[tokio::test]
async fn failed_payment_is_recorded_and_audited() {
    let db = setup_test_db().await;
    let (server, mailer) = setup_server(&db).await;

    let mut fields = base_fields(&[("payment_status", "failed".to_string())]);
    product_item(&mut fields);
    let fields = signed_payment_fields(fields).await;

    let resp = server.post("/api/v1/payments/notify").form(&fields).await;
    resp.assert_status(StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["outcome"], "failed");

    assert_eq!(orders_with_status(&db.pool, "failed").await, 1);
    assert_eq!(orders_with_status(&db.pool, "paid").await, 0);

    let audited: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_audit")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(audited, 1);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn session_booking_decrements_seats_with_fallback() {
    let db = setup_test_db().await;
    let (mut server, _mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "stagiaire@test.example").await;
    let course_id = seed_course(&db.pool, "Taille des arbres fruitiers", "presential").await;
    let session_id = seed_session(&db.pool, course_id, 8).await;

    // no session id in the payload: falls back to the earliest open session
    let mut fields = base_fields(&[("user_id", user_id.to_string())]);
    fields.insert("item_1_kind".into(), "presential_session".into());
    fields.insert("item_1_course_id".into(), course_id.to_string());
    fields.insert("item_1_label".into(), "Taille des arbres fruitiers".into());
    fields.insert("item_1_quantity".into(), "2".into());
    fields.insert("item_1_unit_price".into(), "6450".into());
    let fields = signed_payment_fields(fields).await;

    let resp = server.post("/api/v1/payments/notify").form(&fields).await;
    resp.assert_status(StatusCode::OK);

    let seats_left: i32 =
        sqlx::query_scalar("SELECT seats_left FROM course_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(seats_left, 6);

    let participants: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM session_participants WHERE session_id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(participants, 1);
}

#[tokio::test]
async fn sold_out_session_acknowledges_without_granting() {
    let db = setup_test_db().await;
    let (mut server, mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "tardif@test.example").await;
    let course_id = seed_course(&db.pool, "Vinification", "presential").await;
    let session_id = seed_session(&db.pool, course_id, 1).await;

    let mut fields = base_fields(&[("user_id", user_id.to_string())]);
    fields.insert("item_1_kind".into(), "presential_session".into());
    fields.insert("item_1_course_id".into(), course_id.to_string());
    fields.insert("item_1_session_id".into(), session_id.to_string());
    fields.insert("item_1_label".into(), "Vinification".into());
    fields.insert("item_1_quantity".into(), "2".into());
    fields.insert("item_1_unit_price".into(), "6450".into());
    let fields = signed_payment_fields(fields).await;

    // still a 200: the provider must not retry, the team gets the audit row
    let resp = server.post("/api/v1/payments/notify").form(&fields).await;
    resp.assert_status(StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["outcome"], "sold_out");

    let seats_left: i32 =
        sqlx::query_scalar("SELECT seats_left FROM course_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(seats_left, 1);

    assert_eq!(orders_with_status(&db.pool, "paid").await, 0);
    let audited: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_audit")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(audited, 1);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn unknown_status_is_acknowledged_and_ignored() {
    let db = setup_test_db().await;
    let (server, _mailer) = setup_server(&db).await;

    let mut fields = base_fields(&[("payment_status", "chargeback".to_string())]);
    product_item(&mut fields);
    let fields = signed_payment_fields(fields).await;

    let resp = server.post("/api/v1/payments/notify").form(&fields).await;
    resp.assert_status(StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["outcome"], "ignored");

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn malformed_payload_is_reported_before_the_signature() {
    let db = setup_test_db().await;
    let (server, _mailer) = setup_server(&db).await;

    // no payment_status and no signature: the structural error answers first
    let mut fields = base_fields(&[]);
    product_item(&mut fields);
    fields.remove("payment_status");

    let resp = server.post("/api/v1/payments/notify").form(&fields).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Notification de paiement invalide.");
    assert_eq!(orders_with_status(&db.pool, "paid").await, 0);
}
