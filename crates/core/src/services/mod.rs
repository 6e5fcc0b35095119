//! Business logic services.

#![allow(missing_docs)]

pub mod absence_reason;
pub mod attendance;
pub mod auth;
pub mod case;
pub mod dispatcher;
pub mod email;
pub mod hearing;
pub mod hearing_notification;
pub mod notification;
pub mod qr;
pub mod settings;
pub mod sms;

pub use absence_reason::{AbsenceReasonService, ReviewReasonInput, SubmitReasonInput};
pub use attendance::{
    AttendanceService, CodeType, MarkAttendanceInput, MarkOutcome, MarkStatusInput,
};
pub use auth::{AuthService, Claims, LoginInput, RegisterInput, Session};
pub use case::{AddWitnessInput, CaseService, CreateCaseInput, UpdateCaseInput};
pub use dispatcher::{ChannelResult, DispatchReport, NotificationDispatcher, NotificationPayload};
pub use email::{EmailMessage, EmailSender, EmailService};
pub use hearing::{CreateHearingInput, HearingService, QrContent};
pub use hearing_notification::{AttendanceOutcome, HearingNotificationService, PlannedNotice};
pub use notification::{ListNotificationsInput, NotificationService};
pub use qr::{QrCodec, QrPayload};
pub use settings::{SettingsService, UpdateSettingsInput};
pub use sms::{SmsSender, sms_sender_from_config};
