//! Reminder tiers.

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;

use bailiff_db::entities::{
    hearing_session::{self, HearingStatus, SentFlag},
    settings,
};

/// One category of reminder, processed independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderTier {
    /// One week before the hearing.
    Weekly,
    /// Morning of the hearing.
    DayOf,
    /// After the hearing, once the cooldown has passed.
    PostHearing,
}

impl ReminderTier {
    /// All tiers.
    pub const ALL: [Self; 3] = [Self::Weekly, Self::DayOf, Self::PostHearing];

    /// Name used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::DayOf => "day_of",
            Self::PostHearing => "post_hearing",
        }
    }

    /// The hearing flag that gates this tier.
    #[must_use]
    pub const fn flag(self) -> SentFlag {
        match self {
            Self::Weekly => SentFlag::WeeklyReminder,
            Self::DayOf => SentFlag::DayOfReminder,
            Self::PostHearing => SentFlag::PostHearing,
        }
    }

    /// Hearing statuses the tier considers.
    #[must_use]
    pub const fn statuses(self) -> &'static [HearingStatus] {
        match self {
            Self::Weekly | Self::DayOf => &[HearingStatus::Scheduled],
            Self::PostHearing => &[
                HearingStatus::Scheduled,
                HearingStatus::Ongoing,
                HearingStatus::Completed,
            ],
        }
    }

    /// Hearing date the tier looks at, given the court's "today".
    #[must_use]
    pub fn target_date(self, today: NaiveDate, weekly_lead_days: i64) -> NaiveDate {
        match self {
            Self::Weekly => today + Duration::days(weekly_lead_days),
            Self::DayOf | Self::PostHearing => today,
        }
    }

    /// Whether an administrator has switched the tier off.
    #[must_use]
    pub const fn is_enabled(self, settings: &settings::Model) -> bool {
        match self {
            Self::Weekly => settings.weekly_reminders_enabled,
            Self::DayOf => settings.day_of_reminders_enabled,
            Self::PostHearing => settings.post_hearing_enabled,
        }
    }
}

/// Whether `cooldown` has passed since the hearing's scheduled start.
/// A hearing with an unreadable time is never due.
#[must_use]
pub fn cooldown_elapsed(
    hearing: &hearing_session::Model,
    now: DateTime<Tz>,
    cooldown: Duration,
) -> bool {
    hearing
        .scheduled_start(now.timezone())
        .is_some_and(|start| now >= start + cooldown)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bailiff_db::test_utils::fixtures;
    use chrono::TimeZone;

    const TZ: Tz = chrono_tz::Asia::Kolkata;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn test_target_dates() {
        assert_eq!(
            ReminderTier::Weekly.target_date(today(), 7),
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
        );
        assert_eq!(ReminderTier::DayOf.target_date(today(), 7), today());
        assert_eq!(ReminderTier::PostHearing.target_date(today(), 7), today());
    }

    #[test]
    fn test_cooldown_boundary() {
        let hearing = fixtures::hearing("h1", "c1", today(), "10:00");
        let cooldown = Duration::hours(2);

        let before = TZ.with_ymd_and_hms(2026, 3, 2, 11, 59, 0).unwrap();
        let after = TZ.with_ymd_and_hms(2026, 3, 2, 12, 1, 0).unwrap();
        assert!(!cooldown_elapsed(&hearing, before, cooldown));
        assert!(cooldown_elapsed(&hearing, after, cooldown));
    }

    #[test]
    fn test_malformed_time_never_due() {
        let hearing = fixtures::hearing("h1", "c1", today(), "noon");
        let late = TZ.with_ymd_and_hms(2026, 3, 2, 23, 0, 0).unwrap();
        assert!(!cooldown_elapsed(&hearing, late, Duration::hours(2)));
    }

    #[test]
    fn test_post_hearing_includes_completed() {
        assert!(ReminderTier::PostHearing
            .statuses()
            .contains(&HearingStatus::Completed));
        assert!(!ReminderTier::DayOf
            .statuses()
            .contains(&HearingStatus::Cancelled));
    }
}
