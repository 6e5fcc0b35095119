//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `bailiff_test`)
//!   `TEST_DB_PASSWORD` (default: `bailiff_test`)
//!   `TEST_DB_NAME` (default: `bailiff_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use bailiff_db::{
    entities::{
        attendance::{self, AttendanceStatus, MarkMethod},
        hearing_session::SentFlag,
        user::UserRole,
    },
    repositories::{
        AttendanceRepository, CaseRepository, HearingRepository, MarkUpdate, SettingsRepository,
        UserRepository,
    },
    test_utils::{TestDatabase, fixtures},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, IntoActiveModel};

async fn seed(db: &TestDatabase) -> (String, String) {
    let conn = db.connection();
    let officer = fixtures::user("io1", UserRole::InvestigatingOfficer);
    officer.into_active_model().reset_all().insert(conn).await.unwrap();

    let case = fixtures::case("c1", "io1");
    case.into_active_model().reset_all().insert(conn).await.unwrap();

    let hearing = fixtures::hearing("h1", "c1", Utc::now().date_naive(), "10:00");
    hearing.into_active_model().reset_all().insert(conn).await.unwrap();

    let record = fixtures::attendance("a1", "h1", "io1", AttendanceStatus::NotMarked);
    record.into_active_model().reset_all().insert(conn).await.unwrap();

    ("h1".to_string(), "a1".to_string())
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_migrations_seed_settings() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    let repo = SettingsRepository::new(Arc::new(db.conn.clone()));

    let settings = repo.get().await.unwrap();
    assert_eq!(settings.id, "global");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_marks_flip_once() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let (_, attendance_id) = seed(&db).await;

    let repo = AttendanceRepository::new(Arc::new(db.conn.clone()));
    let update = MarkUpdate {
        status: AttendanceStatus::Present,
        method: MarkMethod::Manual,
        marked_by: "io1".to_string(),
        arrival_time: Some(Utc::now()),
        qr_scanned_at: None,
        is_verified: false,
        remarks: None,
    };

    let (a, b) = tokio::join!(
        repo.mark_if_status(&attendance_id, AttendanceStatus::NotMarked, &update),
        repo.mark_if_status(&attendance_id, AttendanceStatus::NotMarked, &update),
    );
    assert!(a.unwrap() ^ b.unwrap(), "exactly one mark must win");

    let stored: attendance::Model = repo.get_by_id(&attendance_id).await.unwrap();
    assert_eq!(stored.status, AttendanceStatus::Present);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_sent_flag_set_once() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let (hearing_id, _) = seed(&db).await;

    let repo = HearingRepository::new(Arc::new(db.conn.clone()));
    assert!(repo.mark_flag(&hearing_id, SentFlag::DayOfReminder).await.unwrap());
    assert!(!repo.mark_flag(&hearing_id, SentFlag::DayOfReminder).await.unwrap());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_email_is_conflict() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let repo = UserRepository::new(Arc::new(db.conn.clone()));

    let first = fixtures::user("u1", UserRole::Witness);
    let mut second = fixtures::user("u2", UserRole::Witness);
    second.email = first.email.clone();

    repo.create(first.into_active_model().reset_all()).await.unwrap();
    let err = repo
        .create(second.into_active_model().reset_all())
        .await
        .unwrap_err();
    assert!(matches!(err, bailiff_common::AppError::Conflict(_)));

    let cases = CaseRepository::new(Arc::new(db.conn.clone()));
    assert!(cases.find_by_id("nope").await.unwrap().is_none());
}
