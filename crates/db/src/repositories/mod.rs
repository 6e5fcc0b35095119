//! Repositories: one per table, each holding a shared connection.

mod absence_reason;
mod attendance;
mod case;
mod hearing;
mod notification;
mod settings;
mod user;
mod witness;

pub use absence_reason::AbsenceReasonRepository;
pub use attendance::{AttendanceRepository, MarkUpdate};
pub use case::{CaseFilter, CaseRepository};
pub use hearing::HearingRepository;
pub use notification::{NotificationQuery, NotificationRepository};
pub use settings::SettingsRepository;
pub use user::UserRepository;
pub use witness::WitnessRepository;

use bailiff_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map a write error, surfacing unique-index violations as conflicts.
pub(crate) fn db_err(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(e.to_string()),
    }
}
