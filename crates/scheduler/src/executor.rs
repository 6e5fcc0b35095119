//! What the scheduler asks of the rest of the system.

use chrono::NaiveDate;

use crate::tier::ReminderTier;
use bailiff_common::AppResult;
use bailiff_core::HearingNotificationService;
use bailiff_db::{
    entities::{hearing_session, settings},
    repositories::{HearingRepository, SettingsRepository},
};

/// Executor for reminder tiers.
#[async_trait::async_trait]
pub trait ReminderExecutor: Send + Sync {
    /// Organisation switches, consulted once per tier run.
    async fn settings(&self) -> AppResult<settings::Model>;

    /// Hearings on `date` eligible for `tier` whose flag is still unset.
    async fn due_hearings(
        &self,
        tier: ReminderTier,
        date: NaiveDate,
    ) -> AppResult<Vec<hearing_session::Model>>;

    /// Send the tier's notifications for one hearing.
    async fn send(&self, tier: ReminderTier, hearing: &hearing_session::Model) -> AppResult<()>;

    /// Set the tier's flag. Returns `false` if it was already set.
    async fn mark_sent(&self, tier: ReminderTier, hearing_id: &str) -> AppResult<bool>;
}

/// Database-backed executor.
#[derive(Clone)]
pub struct DbReminderExecutor {
    hearing_repo: HearingRepository,
    settings_repo: SettingsRepository,
    notifier: HearingNotificationService,
}

impl DbReminderExecutor {
    /// Create a new executor.
    #[must_use]
    pub const fn new(
        hearing_repo: HearingRepository,
        settings_repo: SettingsRepository,
        notifier: HearingNotificationService,
    ) -> Self {
        Self {
            hearing_repo,
            settings_repo,
            notifier,
        }
    }
}

#[async_trait::async_trait]
impl ReminderExecutor for DbReminderExecutor {
    async fn settings(&self) -> AppResult<settings::Model> {
        self.settings_repo.get().await
    }

    async fn due_hearings(
        &self,
        tier: ReminderTier,
        date: NaiveDate,
    ) -> AppResult<Vec<hearing_session::Model>> {
        self.hearing_repo
            .find_due(date, tier.statuses(), tier.flag())
            .await
    }

    async fn send(&self, tier: ReminderTier, hearing: &hearing_session::Model) -> AppResult<()> {
        match tier {
            ReminderTier::Weekly => {
                let count = self.notifier.send_weekly_reminder(hearing).await?;
                tracing::debug!(hearing_id = %hearing.id, count, "Weekly reminders sent");
            }
            ReminderTier::DayOf => {
                let count = self.notifier.send_day_of_reminder(hearing).await?;
                tracing::debug!(hearing_id = %hearing.id, count, "Day-of reminders sent");
            }
            ReminderTier::PostHearing => {
                let outcome = self.notifier.send_post_hearing(hearing).await?;
                tracing::debug!(hearing_id = %hearing.id, outcome = outcome.label(), "Post-hearing analysis done");
            }
        }
        Ok(())
    }

    async fn mark_sent(&self, tier: ReminderTier, hearing_id: &str) -> AppResult<bool> {
        self.hearing_repo.mark_flag(hearing_id, tier.flag()).await
    }
}
