//! Reminder scheduler for bailiff.
//!
//! Three independent tiers scan hearing sessions and hand the due ones to
//! the hearing notification service:
//!
//! - **Weekly**: hearings a week out
//! - **Day-of**: hearings today
//! - **Post-hearing**: today's hearings once the cooldown after their start
//!   has passed, run daily at a fixed local hour
//!
//! The only guard against repeat sends is the per-tier "sent" flag on each
//! hearing, set after the tier's notifications succeed.

pub mod executor;
pub mod scheduler;
pub mod tier;

pub use executor::{DbReminderExecutor, ReminderExecutor};
pub use scheduler::{ReminderScheduler, SchedulerConfig, TierReport};
pub use tier::ReminderTier;
