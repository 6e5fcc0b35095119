//! Multi-channel notification dispatcher.
//!
//! Every notification is written in-app. `high` and `urgent` notifications
//! additionally go out by SMS and email when the recipient has the contact
//! detail and the channel is switched on. Each channel reports its own
//! [`ChannelResult`]; only the in-app write can fail the call.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;

use crate::services::{
    email::{EmailSender, EmailService},
    sms::SmsSender,
};
use bailiff_common::{AppResult, IdGenerator};
use bailiff_db::{
    entities::{
        notification::{self, NotificationPriority, NotificationType},
        settings, user,
    },
    repositories::{NotificationRepository, SettingsRepository},
};

/// What to tell a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Notification type.
    pub notification_type: NotificationType,
    /// Priority; decides the channels.
    pub priority: NotificationPriority,
    /// Related case.
    pub case_id: Option<String>,
    /// Related hearing.
    pub hearing_session_id: Option<String>,
}

/// Outcome of one delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelResult {
    /// Accepted by the provider.
    Sent {
        /// Provider name.
        provider: String,
        /// Provider message ID.
        message_id: String,
    },
    /// The provider call failed.
    Failed {
        /// Provider name.
        provider: String,
        /// Error detail.
        error: String,
    },
    /// The channel was not attempted.
    Skipped {
        /// Why.
        reason: String,
    },
}

impl ChannelResult {
    fn skipped(reason: &str) -> Self {
        Self::Skipped {
            reason: reason.to_string(),
        }
    }

    /// Whether the provider accepted the message.
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Per-channel results of one dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    /// The stored in-app notification.
    pub in_app: notification::Model,
    /// SMS outcome.
    pub sms: ChannelResult,
    /// Email outcome.
    pub email: ChannelResult,
}

/// Fans one notification out to in-app, SMS and email.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notification_repo: NotificationRepository,
    settings_repo: SettingsRepository,
    sms: Option<Arc<dyn SmsSender>>,
    email: Option<Arc<dyn EmailSender>>,
    dashboard_url: String,
    id_gen: IdGenerator,
}

impl NotificationDispatcher {
    /// Create a dispatcher. Pass `None` for channels without a provider.
    #[must_use]
    pub fn new(
        notification_repo: NotificationRepository,
        settings_repo: SettingsRepository,
        sms: Option<Arc<dyn SmsSender>>,
        email: Option<Arc<dyn EmailSender>>,
        dashboard_url: impl Into<String>,
    ) -> Self {
        Self {
            notification_repo,
            settings_repo,
            sms,
            email,
            dashboard_url: dashboard_url.into(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Deliver `payload` to `recipient`.
    pub async fn dispatch(
        &self,
        recipient: &user::Model,
        payload: &NotificationPayload,
    ) -> AppResult<DispatchReport> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient.id.clone()),
            title: Set(payload.title.clone()),
            message: Set(payload.message.clone()),
            notification_type: Set(payload.notification_type),
            priority: Set(payload.priority),
            case_id: Set(payload.case_id.clone()),
            hearing_session_id: Set(payload.hearing_session_id.clone()),
            is_read: Set(false),
            read_at: Set(None),
            is_archived: Set(false),
            created_at: Set(Utc::now().into()),
        };
        let in_app = self.notification_repo.create(model).await?;

        if !payload.priority.is_elevated() {
            return Ok(DispatchReport {
                in_app,
                sms: ChannelResult::skipped("priority below high"),
                email: ChannelResult::skipped("priority below high"),
            });
        }

        let settings = match self.settings_repo.get().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load settings; skipping SMS and email");
                return Ok(DispatchReport {
                    in_app,
                    sms: ChannelResult::skipped("settings unavailable"),
                    email: ChannelResult::skipped("settings unavailable"),
                });
            }
        };

        let (sms, email) = tokio::join!(
            self.send_sms(recipient, payload, &settings),
            self.send_email(recipient, payload, &settings),
        );

        tracing::debug!(
            recipient = %recipient.id,
            notification = %in_app.id,
            sms_sent = sms.is_sent(),
            email_sent = email.is_sent(),
            "Notification dispatched"
        );

        Ok(DispatchReport { in_app, sms, email })
    }

    async fn send_sms(
        &self,
        recipient: &user::Model,
        payload: &NotificationPayload,
        settings: &settings::Model,
    ) -> ChannelResult {
        let Some(sender) = &self.sms else {
            return ChannelResult::skipped("no SMS provider configured");
        };
        if !settings.sms_enabled {
            return ChannelResult::skipped("SMS disabled in settings");
        }
        let Some(phone) = recipient.phone.as_deref().filter(|p| !p.trim().is_empty()) else {
            return ChannelResult::skipped("recipient has no phone number");
        };

        let body = format!("{}: {}", payload.title, payload.message);
        match sender.send(phone, &body).await {
            Ok(message_id) => ChannelResult::Sent {
                provider: sender.provider().to_string(),
                message_id,
            },
            Err(e) => {
                tracing::warn!(error = %e, recipient = %recipient.id, "SMS delivery failed");
                ChannelResult::Failed {
                    provider: sender.provider().to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn send_email(
        &self,
        recipient: &user::Model,
        payload: &NotificationPayload,
        settings: &settings::Model,
    ) -> ChannelResult {
        let Some(sender) = &self.email else {
            return ChannelResult::skipped("no email provider configured");
        };
        if !settings.email_enabled {
            return ChannelResult::skipped("email disabled in settings");
        }
        if recipient.email.trim().is_empty() {
            return ChannelResult::skipped("recipient has no email address");
        }

        let message = EmailService::render_notification(
            &recipient.email,
            &payload.title,
            &payload.message,
            &settings.organisation_name,
            &self.dashboard_url,
        );
        match sender.send(message).await {
            Ok(message_id) => ChannelResult::Sent {
                provider: sender.provider().to_string(),
                message_id,
            },
            Err(e) => {
                tracing::warn!(error = %e, recipient = %recipient.id, "Email delivery failed");
                ChannelResult::Failed {
                    provider: sender.provider().to_string(),
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::services::email::EmailMessage;
    use async_trait::async_trait;
    use bailiff_common::AppError;
    use bailiff_db::{entities::user::UserRole, test_utils::fixtures};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Mutex;

    /// Records messages; fails every send when `fail` is set.
    #[derive(Default)]
    pub struct FakeSms {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl SmsSender for FakeSms {
        fn provider(&self) -> &'static str {
            "fake-sms"
        }

        async fn send(&self, to: &str, body: &str) -> AppResult<String> {
            if self.fail {
                return Err(AppError::ExternalService("gateway down".to_string()));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push((to.to_string(), body.to_string()));
            Ok(format!("sms-{}", sent.len()))
        }
    }

    #[derive(Default)]
    pub struct FakeEmail {
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for FakeEmail {
        fn provider(&self) -> &'static str {
            "fake-email"
        }

        async fn send(&self, message: EmailMessage) -> AppResult<String> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message);
            Ok(format!("mail-{}", sent.len()))
        }
    }

    pub fn payload(priority: NotificationPriority) -> NotificationPayload {
        NotificationPayload {
            title: "Hearing today".to_string(),
            message: "Report to court room 4 by 10:00".to_string(),
            notification_type: NotificationType::HearingToday,
            priority,
            case_id: Some("c1".to_string()),
            hearing_session_id: Some("h1".to_string()),
        }
    }

    fn dispatcher(
        db: DatabaseConnection,
        sms: Arc<FakeSms>,
        email: Arc<FakeEmail>,
    ) -> NotificationDispatcher {
        let db = Arc::new(db);
        NotificationDispatcher::new(
            NotificationRepository::new(db.clone()),
            SettingsRepository::new(db),
            Some(sms as Arc<dyn SmsSender>),
            Some(email as Arc<dyn EmailSender>),
            "https://attendance.example.org",
        )
    }

    #[tokio::test]
    async fn test_normal_priority_is_in_app_only() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::notification("n1", "w1")]])
            .into_connection();
        let sms = Arc::new(FakeSms::default());
        let email = Arc::new(FakeEmail::default());

        let report = dispatcher(db, sms.clone(), email.clone())
            .dispatch(
                &fixtures::user("w1", UserRole::Witness),
                &payload(NotificationPriority::Normal),
            )
            .await
            .unwrap();

        assert!(matches!(report.sms, ChannelResult::Skipped { .. }));
        assert!(matches!(report.email, ChannelResult::Skipped { .. }));
        assert!(sms.sent.lock().unwrap().is_empty());
        assert!(email.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_urgent_fans_out() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::notification("n1", "w1")]])
            .append_query_results([[settings::Model::defaults()]])
            .into_connection();
        let sms = Arc::new(FakeSms::default());
        let email = Arc::new(FakeEmail::default());

        let report = dispatcher(db, sms.clone(), email.clone())
            .dispatch(
                &fixtures::user("w1", UserRole::Witness),
                &payload(NotificationPriority::Urgent),
            )
            .await
            .unwrap();

        assert_eq!(
            report.sms,
            ChannelResult::Sent {
                provider: "fake-sms".to_string(),
                message_id: "sms-1".to_string(),
            }
        );
        assert!(report.email.is_sent());
        assert_eq!(
            sms.sent.lock().unwrap()[0].1,
            "Hearing today: Report to court room 4 by 10:00"
        );
        assert_eq!(email.sent.lock().unwrap()[0].to, "w1@example.test");
    }

    #[tokio::test]
    async fn test_channel_failure_does_not_abort() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::notification("n1", "w1")]])
            .append_query_results([[settings::Model::defaults()]])
            .into_connection();
        let sms = Arc::new(FakeSms {
            fail: true,
            ..FakeSms::default()
        });
        let email = Arc::new(FakeEmail::default());

        let report = dispatcher(db, sms, email.clone())
            .dispatch(
                &fixtures::user("w1", UserRole::Witness),
                &payload(NotificationPriority::High),
            )
            .await
            .unwrap();

        assert!(matches!(report.sms, ChannelResult::Failed { ref error, .. } if error.contains("gateway down")));
        assert!(report.email.is_sent());
    }

    #[tokio::test]
    async fn test_missing_phone_and_disabled_email() {
        let mut settings = settings::Model::defaults();
        settings.email_enabled = false;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::notification("n1", "w1")]])
            .append_query_results([[settings]])
            .into_connection();
        let mut witness = fixtures::user("w1", UserRole::Witness);
        witness.phone = None;

        let report = dispatcher(
            db,
            Arc::new(FakeSms::default()),
            Arc::new(FakeEmail::default()),
        )
        .dispatch(&witness, &payload(NotificationPriority::Urgent))
        .await
        .unwrap();

        assert_eq!(
            report.sms,
            ChannelResult::Skipped {
                reason: "recipient has no phone number".to_string()
            }
        );
        assert_eq!(
            report.email,
            ChannelResult::Skipped {
                reason: "email disabled in settings".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_in_app_failure_raises() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([sea_orm::DbErr::Custom("down".to_string())])
            .into_connection();

        let result = dispatcher(
            db,
            Arc::new(FakeSms::default()),
            Arc::new(FakeEmail::default()),
        )
        .dispatch(
            &fixtures::user("w1", UserRole::Witness),
            &payload(NotificationPriority::Urgent),
        )
        .await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
