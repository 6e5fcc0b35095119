//! Test utilities for database operations.
//!
//! [`TestDatabase`] talks to a real `PostgreSQL`; [`fixtures`] builds model
//! values for `MockDatabase` tests across the workspace.

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "bailiff_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "bailiff_test".to_string()),
            database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "bailiff_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect with the default configuration and run migrations.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with a custom configuration and run migrations.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Connected to test database");

        Ok(Self { conn, config })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Truncate every application table. The settings seed row is restored
    /// lazily by the repository defaults.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        let tables = self
            .conn
            .query_all(Statement::from_string(
                DatabaseBackend::Postgres,
                "SELECT tablename FROM pg_tables WHERE schemaname = 'public'".to_string(),
            ))
            .await?;

        for row in tables {
            if let Ok(table_name) = row.try_get::<String>("", "tablename") {
                if table_name == "seaql_migrations" {
                    continue;
                }

                let truncate = format!("TRUNCATE TABLE \"{table_name}\" CASCADE");
                self.conn
                    .execute(Statement::from_string(DatabaseBackend::Postgres, truncate))
                    .await?;
            }
        }

        info!("Cleaned up test database");
        Ok(())
    }
}

/// Model builders with sensible defaults.
pub mod fixtures {
    use chrono::{NaiveDate, Utc};

    use crate::entities::{
        absence_reason::{self, AbsenceCategory, ReasonStatus},
        attendance::{self, AttendanceStatus, AttendeeRole},
        case::{self, CaseStatus},
        hearing_session::{self, HearingStatus},
        notification::{self, NotificationPriority, NotificationType},
        user::{self, UserRole},
        witness,
    };

    /// An active user.
    #[must_use]
    pub fn user(id: &str, role: UserRole) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.test"),
            phone: Some("+919800000000".to_string()),
            password_hash: String::new(),
            role,
            badge_number: None,
            police_station: None,
            is_active: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    /// A pending case assigned to `officer_id`.
    #[must_use]
    pub fn case(id: &str, officer_id: &str) -> case::Model {
        case::Model {
            id: id.to_string(),
            fir_number: format!("FIR-{id}"),
            title: format!("State vs {id}"),
            description: None,
            police_station: "Central".to_string(),
            court_name: "District Court".to_string(),
            sections: None,
            investigating_officer_id: officer_id.to_string(),
            liaison_officer_id: None,
            status: CaseStatus::Pending,
            attendance_status: None,
            next_hearing_date: None,
            next_hearing_time: None,
            created_by: "admin".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    /// `user_id` attached to `case_id` as a witness.
    #[must_use]
    pub fn witness(id: &str, case_id: &str, user_id: &str) -> witness::Model {
        witness::Model {
            id: id.to_string(),
            case_id: case_id.to_string(),
            user_id: user_id.to_string(),
            address: None,
            statement_recorded: false,
            created_at: Utc::now().into(),
        }
    }

    /// A scheduled hearing with no flags set.
    #[must_use]
    pub fn hearing(id: &str, case_id: &str, date: NaiveDate, time: &str) -> hearing_session::Model {
        hearing_session::Model {
            id: id.to_string(),
            case_id: case_id.to_string(),
            hearing_date: date,
            hearing_time: time.to_string(),
            court_room: Some("4".to_string()),
            judge_name: None,
            qr_code: format!("{{\"h\":\"{id}\"}}"),
            manual_code: format!("M{id}").to_uppercase(),
            status: HearingStatus::Scheduled,
            weekly_reminder_sent: false,
            day_of_reminder_sent: false,
            post_notifications_sent: false,
            notification_sent: false,
            notes: None,
            created_by: "admin".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    /// An attendance record; the attendee role is derived from the user id
    /// prefix (`io`/`lo` are officers).
    #[must_use]
    pub fn attendance(
        id: &str,
        hearing_id: &str,
        user_id: &str,
        status: AttendanceStatus,
    ) -> attendance::Model {
        let attendee_role = if user_id.starts_with("io") || user_id.starts_with("lo") {
            AttendeeRole::Officer
        } else {
            AttendeeRole::Witness
        };

        attendance::Model {
            id: id.to_string(),
            hearing_session_id: hearing_id.to_string(),
            case_id: "c1".to_string(),
            user_id: user_id.to_string(),
            attendee_role,
            hearing_date: Utc::now().date_naive(),
            status,
            marked_method: None,
            marked_by: None,
            arrival_time: None,
            qr_scanned_at: None,
            is_verified: false,
            verified_by: None,
            remarks: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    /// A pending absence reason filed against attendance `a-{user_id}`.
    #[must_use]
    pub fn absence_reason(id: &str, user_id: &str, category: AbsenceCategory) -> absence_reason::Model {
        absence_reason::Model {
            id: id.to_string(),
            attendance_id: format!("a-{user_id}"),
            hearing_session_id: "h1".to_string(),
            case_id: "c1".to_string(),
            user_id: user_id.to_string(),
            category,
            reason: "Admitted to hospital".to_string(),
            document_url: None,
            status: ReasonStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_comment: None,
            notification_sent: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    /// An unread notification.
    #[must_use]
    pub fn notification(id: &str, recipient_id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient_id.to_string(),
            title: "Hearing reminder".to_string(),
            message: "You have a hearing".to_string(),
            notification_type: NotificationType::HearingReminder,
            priority: NotificationPriority::Normal,
            case_id: None,
            hearing_session_id: None,
            is_read: false,
            read_at: None,
            is_archived: false,
            created_at: Utc::now().into(),
        }
    }
}
