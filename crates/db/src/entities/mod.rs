//! Database entities.

pub mod absence_reason;
pub mod attendance;
pub mod case;
pub mod hearing_session;
pub mod notification;
pub mod settings;
pub mod user;
pub mod witness;

pub use absence_reason::Entity as AbsenceReason;
pub use attendance::Entity as Attendance;
pub use case::Entity as Case;
pub use hearing_session::Entity as HearingSession;
pub use notification::Entity as Notification;
pub use settings::Entity as Settings;
pub use user::Entity as User;
pub use witness::Entity as Witness;
