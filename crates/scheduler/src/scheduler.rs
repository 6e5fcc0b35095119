//! Tier runs and the background loops driving them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use tokio::time::{interval, sleep};

use crate::{
    executor::ReminderExecutor,
    tier::{ReminderTier, cooldown_elapsed},
};
use bailiff_common::{AppError, AppResult, SharedClock, config::SchedulerSettings};

/// Post-hearing scans repeat daily after the first aligned run.
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Court timezone; "today" is computed here.
    pub timezone: Tz,
    /// Period of the weekly and day-of scans.
    pub tick_interval: Duration,
    /// Local hour of the daily post-hearing scan.
    pub post_hearing_hour: u32,
    /// Time after the hearing start before post-hearing analysis.
    pub post_hearing_cooldown: chrono::Duration,
    /// Days ahead the weekly reminder looks.
    pub weekly_lead_days: i64,
}

impl SchedulerConfig {
    /// Build from the `[scheduler]` configuration section.
    pub fn from_settings(settings: &SchedulerSettings) -> AppResult<Self> {
        if settings.post_hearing_hour > 23 {
            return Err(AppError::Config(format!(
                "scheduler.post_hearing_hour must be 0-23, got {}",
                settings.post_hearing_hour
            )));
        }

        Ok(Self {
            timezone: settings.tz()?,
            tick_interval: Duration::from_secs(settings.tick_interval_secs.max(1)),
            post_hearing_hour: settings.post_hearing_hour,
            post_hearing_cooldown: chrono::Duration::minutes(settings.post_hearing_cooldown_minutes),
            weekly_lead_days: settings.weekly_lead_days,
        })
    }
}

/// Counts from one tier run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierReport {
    /// The tier is switched off in settings.
    pub disabled: bool,
    /// Hearings whose notifications went out and whose flag was set.
    pub sent: usize,
    /// Hearings whose notifications failed; retried next run.
    pub failed: usize,
    /// Hearings not due yet (post-hearing cooldown) or already flagged.
    pub skipped: usize,
}

/// Runs reminder tiers against an executor.
pub struct ReminderScheduler<E> {
    config: SchedulerConfig,
    executor: Arc<E>,
    clock: SharedClock,
}

impl<E: ReminderExecutor + 'static> ReminderScheduler<E> {
    /// Create a new scheduler.
    #[must_use]
    pub const fn new(config: SchedulerConfig, executor: Arc<E>, clock: SharedClock) -> Self {
        Self {
            config,
            executor,
            clock,
        }
    }

    /// Process every due hearing of one tier. Hearings are handled one at a
    /// time; a failure is logged and the rest of the batch continues.
    pub async fn run_tier(&self, tier: ReminderTier) -> AppResult<TierReport> {
        let mut report = TierReport::default();

        let settings = self.executor.settings().await?;
        if !tier.is_enabled(&settings) {
            tracing::debug!(tier = tier.label(), "Tier disabled in settings");
            report.disabled = true;
            return Ok(report);
        }

        let now = self.clock.now_in(self.config.timezone);
        let date = tier.target_date(now.date_naive(), self.config.weekly_lead_days);
        let hearings = self.executor.due_hearings(tier, date).await?;

        for hearing in &hearings {
            if tier.flag().is_set(hearing) {
                report.skipped += 1;
                continue;
            }
            if tier == ReminderTier::PostHearing
                && !cooldown_elapsed(hearing, now, self.config.post_hearing_cooldown)
            {
                tracing::debug!(hearing_id = %hearing.id, "Post-hearing cooldown not over");
                report.skipped += 1;
                continue;
            }

            if let Err(e) = self.executor.send(tier, hearing).await {
                tracing::error!(
                    error = %e,
                    tier = tier.label(),
                    hearing_id = %hearing.id,
                    "Reminder failed; will retry next run"
                );
                report.failed += 1;
                continue;
            }

            match self.executor.mark_sent(tier, &hearing.id).await {
                Ok(true) => report.sent += 1,
                Ok(false) => {
                    tracing::warn!(tier = tier.label(), hearing_id = %hearing.id, "Flag was already set");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, tier = tier.label(), hearing_id = %hearing.id, "Failed to set sent flag");
                    report.failed += 1;
                }
            }
        }

        if report.sent > 0 || report.failed > 0 {
            tracing::info!(
                tier = tier.label(),
                date = %date,
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped,
                "Reminder tier processed"
            );
        }

        Ok(report)
    }

    async fn run_logged(&self, tier: ReminderTier) {
        if let Err(e) = self.run_tier(tier).await {
            tracing::error!(error = %e, tier = tier.label(), "Reminder tier run failed");
        }
    }

    /// Spawn the background loops: weekly and day-of on the tick interval,
    /// post-hearing daily at the configured local hour.
    pub fn spawn(self: Arc<Self>) {
        let tick = self.config.tick_interval;

        for tier in [ReminderTier::Weekly, ReminderTier::DayOf] {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval = interval(tick);
                loop {
                    interval.tick().await;
                    scheduler.run_logged(tier).await;
                }
            });
        }

        let scheduler = self;
        tokio::spawn(async move {
            let now = scheduler.clock.now_in(scheduler.config.timezone);
            let delay = delay_until_hour(now, scheduler.config.post_hearing_hour);
            tracing::info!(
                delay_secs = delay.as_secs(),
                hour = scheduler.config.post_hearing_hour,
                "Post-hearing scan scheduled"
            );
            sleep(delay).await;

            let mut interval = interval(DAY);
            loop {
                interval.tick().await;
                scheduler.run_logged(ReminderTier::PostHearing).await;
            }
        });

        tracing::info!("Reminder scheduler started");
    }
}

/// Time from `now` until the next `hour`:00 local time. Zero when `now` is
/// exactly on the hour.
#[must_use]
pub fn delay_until_hour(now: DateTime<Tz>, hour: u32) -> Duration {
    let tz = now.timezone();
    let target_time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);

    let mut date = now.date_naive();
    loop {
        if let Some(target) = tz.from_local_datetime(&date.and_time(target_time)).earliest() {
            if target >= now {
                return (target - now).to_std().unwrap_or_default();
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => return DAY,
        }
    }
}
