mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::common::{
    OutageMailer, complete_all_lessons, seed_course, seed_enrollment, seed_quiz, seed_section,
    setup_server, setup_server_with_mailer, setup_test_db, signup_user,
};

fn answers(ids: &[Uuid], correct: usize) -> Value {
    let answers: Vec<Value> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "question_id": id,
                "selected_answer": if i < correct { "A" } else { "B" },
            })
        })
        .collect();
    json!({ "answers": answers })
}

async fn seed_ready_course(
    db: &common::FlowDatabase,
    user_id: Uuid,
    questions: usize,
) -> (Uuid, Vec<Uuid>) {
    let course_id = seed_course(&db.pool, "Apiculture", "online").await;
    let lessons = [Uuid::new_v4(), Uuid::new_v4()];
    seed_section(&db.pool, course_id, 0, &lessons).await;
    seed_enrollment(&db.pool, user_id, course_id).await;
    complete_all_lessons(&db.pool, user_id, course_id).await;
    let question_ids = seed_quiz(&db.pool, course_id, questions).await;
    (course_id, question_ids)
}

#[tokio::test]
async fn quiz_get_hides_answer_key() {
    let db = setup_test_db().await;
    let (mut server, _mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "quizget@test.example").await;
    let (course_id, question_ids) = seed_ready_course(&db, user_id, 3).await;

    let resp = server.get(&format!("/api/v1/quiz/{course_id}")).await;
    resp.assert_status(StatusCode::OK);
    let body = resp.text();
    assert!(!body.contains("correct_answer"));

    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["questions"].as_array().unwrap().len(), question_ids.len());
}

#[tokio::test]
async fn quiz_submit_requires_completed_lessons() {
    let db = setup_test_db().await;
    let (mut server, _mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "incomplete@test.example").await;
    let course_id = seed_course(&db.pool, "Apiculture", "online").await;
    let lessons = [Uuid::new_v4(), Uuid::new_v4()];
    seed_section(&db.pool, course_id, 0, &lessons).await;
    seed_enrollment(&db.pool, user_id, course_id).await;
    let question_ids = seed_quiz(&db.pool, course_id, 3).await;

    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&answers(&question_ids, 3))
        .await;
    resp.assert_status(StatusCode::CONFLICT);
    let body: Value = resp.json();
    assert_eq!(
        body["message"],
        "Veuillez terminer toutes les leçons avant de passer le quiz."
    );
}

#[tokio::test]
async fn quiz_pass_sends_certificate_and_is_terminal() {
    let db = setup_test_db().await;
    let (mut server, mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "pass@test.example").await;
    let (course_id, question_ids) = seed_ready_course(&db, user_id, 10).await;

    // 7/10 passes at the inclusive 0.70 threshold
    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&answers(&question_ids, 7))
        .await;
    resp.assert_status(StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["score"], 7);
    assert_eq!(body["total"], 10);
    assert_eq!(body["passed"], true);
    assert_eq!(body["certificate_sent"], true);
    // detail records correctness only, never the expected answer
    assert_eq!(body["detail"].as_array().unwrap().len(), 10);
    assert!(!body.to_string().contains("selected"));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    let attachment = sent[0].attachment.as_ref().expect("certificate attached");
    assert_eq!(attachment.filename, "certificat.pdf");
    assert!(attachment.bytes.starts_with(b"%PDF"));

    // passing is terminal, even with a perfect re-submission
    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&answers(&question_ids, 10))
        .await;
    resp.assert_status(StatusCode::CONFLICT);
    let body: Value = resp.json();
    assert_eq!(
        body["message"],
        "Vous avez déjà réussi ce quiz. Votre certificat vous a été envoyé par e-mail."
    );

    // resend regenerates and re-sends
    let resp = server
        .post(&format!("/api/v1/certificates/{course_id}/resend"))
        .await;
    resp.assert_status(StatusCode::OK);
    assert_eq!(mailer.sent().len(), 2);
}

#[tokio::test]
async fn quiz_fail_records_attempt_without_certificate() {
    let db = setup_test_db().await;
    let (mut server, mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "fail@test.example").await;
    let (course_id, question_ids) = seed_ready_course(&db, user_id, 10).await;

    // 6/10 is below threshold
    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&answers(&question_ids, 6))
        .await;
    resp.assert_status(StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["passed"], false);
    assert_eq!(body["certificate_sent"], false);
    assert!(mailer.sent().is_empty());

    // the failed attempt is persisted
    let attempts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_results WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(attempts, 1);

    // resend has nothing to send yet
    let resp = server
        .post(&format!("/api/v1/certificates/{course_id}/resend"))
        .await;
    resp.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn quiz_daily_quota_is_three_attempts() {
    let db = setup_test_db().await;
    let (mut server, _mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "quota@test.example").await;
    let (course_id, question_ids) = seed_ready_course(&db, user_id, 10).await;

    for _ in 0..3 {
        server
            .post(&format!("/api/v1/quiz/{course_id}/submit"))
            .json(&answers(&question_ids, 0))
            .await
            .assert_status(StatusCode::OK);
    }

    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&answers(&question_ids, 0))
        .await;
    resp.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = resp.json();
    assert_eq!(
        body["message"],
        "Nombre maximal de tentatives atteint pour aujourd'hui. Réessayez demain."
    );
}

#[tokio::test]
async fn quiz_submit_requires_enrollment() {
    let db = setup_test_db().await;
    let (mut server, _mailer) = setup_server(&db).await;

    let _user_id = signup_user(&mut server, "outsider@test.example").await;
    let course_id = seed_course(&db.pool, "Apiculture", "online").await;
    let question_ids = seed_quiz(&db.pool, course_id, 3).await;

    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&answers(&question_ids, 3))
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_submission_is_checked_after_enrollment() {
    let db = setup_test_db().await;
    let (mut server, _mailer) = setup_server(&db).await;

    let user_id = signup_user(&mut server, "vide@test.example").await;
    let course_id = seed_course(&db.pool, "Apiculture", "online").await;
    seed_quiz(&db.pool, course_id, 3).await;

    // not enrolled: the enrollment precondition answers first
    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&json!({ "answers": [] }))
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Vous n'êtes pas inscrit à cette formation.");

    // enrolled: the empty submission itself is the problem
    seed_enrollment(&db.pool, user_id, course_id).await;
    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&json!({ "answers": [] }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Veuillez répondre au moins à une question.");
}

#[tokio::test]
async fn quiz_pass_survives_certificate_outage() {
    let db = setup_test_db().await;
    let mut server = setup_server_with_mailer(&db, Arc::new(OutageMailer)).await;

    let user_id = signup_user(&mut server, "panne@test.example").await;
    let (course_id, question_ids) = seed_ready_course(&db, user_id, 10).await;

    // the relay is down: the pass stands, only the delivery flag reports it
    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&answers(&question_ids, 8))
        .await;
    resp.assert_status(StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["passed"], true);
    assert_eq!(body["certificate_sent"], false);

    // terminal even though the email never left
    let resp = server
        .post(&format!("/api/v1/quiz/{course_id}/submit"))
        .json(&answers(&question_ids, 8))
        .await;
    resp.assert_status(StatusCode::CONFLICT);

    // resend on the broken relay surfaces the failure to the caller
    let resp = server
        .post(&format!("/api/v1/certificates/{course_id}/resend"))
        .await;
    resp.assert_status(StatusCode::BAD_GATEWAY);

    // relay restored: resend delivers and flips the flag
    let (mut recovered, mailer) = setup_server(&db).await;
    recovered.save_cookies();
    recovered
        .post("/api/v1/account/signin")
        .json(&json!({ "email": "panne@test.example", "password": "motdepasse" }))
        .await
        .assert_status(StatusCode::OK);

    let resp = recovered
        .post(&format!("/api/v1/certificates/{course_id}/resend"))
        .await;
    resp.assert_status(StatusCode::OK);
    assert_eq!(mailer.sent().len(), 1);

    let sent_flag: bool = sqlx::query_scalar(
        "SELECT certificate_sent FROM quiz_results WHERE user_id = $1 AND course_id = $2 AND passed",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert!(sent_flag);
}
