//! Application state and session middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use bailiff_common::{AppResult, Config, SharedClock};
use bailiff_core::{
    AbsenceReasonService, AttendanceService, AuthService, CaseService, EmailSender,
    HearingNotificationService, HearingService, NotificationDispatcher, NotificationService,
    QrCodec, SettingsService, SmsSender,
};
use bailiff_db::repositories::{
    AbsenceReasonRepository, AttendanceRepository, CaseRepository, HearingRepository,
    NotificationRepository, SettingsRepository, UserRepository, WitnessRepository,
};
use sea_orm::DatabaseConnection;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub case_service: CaseService,
    pub hearing_service: HearingService,
    pub attendance_service: AttendanceService,
    pub absence_reason_service: AbsenceReasonService,
    pub notification_service: NotificationService,
    pub settings_service: SettingsService,
    pub hearing_notification_service: HearingNotificationService,
    pub cookie_secure: bool,
}

impl AppState {
    /// Wire every service onto one connection pool.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &Config,
        clock: SharedClock,
        sms: Option<Arc<dyn SmsSender>>,
        email: Option<Arc<dyn EmailSender>>,
    ) -> AppResult<Self> {
        let court_tz = config.scheduler.tz()?;
        let qr = QrCodec::new(&config.qr);

        let user_repo = UserRepository::new(Arc::clone(&db));
        let case_repo = CaseRepository::new(Arc::clone(&db));
        let witness_repo = WitnessRepository::new(Arc::clone(&db));
        let hearing_repo = HearingRepository::new(Arc::clone(&db));
        let attendance_repo = AttendanceRepository::new(Arc::clone(&db));
        let reason_repo = AbsenceReasonRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));
        let settings_repo = SettingsRepository::new(db);

        let dispatcher = NotificationDispatcher::new(
            notification_repo.clone(),
            settings_repo.clone(),
            sms,
            email,
            config.server.url.clone(),
        );
        let hearing_notification_service = HearingNotificationService::new(
            case_repo.clone(),
            witness_repo.clone(),
            attendance_repo.clone(),
            user_repo.clone(),
            dispatcher.clone(),
            clock.clone(),
            court_tz,
        );

        Ok(Self {
            auth_service: AuthService::new(user_repo.clone(), &config.auth),
            case_service: CaseService::new(
                case_repo.clone(),
                witness_repo.clone(),
                user_repo.clone(),
                hearing_repo.clone(),
                attendance_repo.clone(),
            ),
            hearing_service: HearingService::new(
                hearing_repo.clone(),
                case_repo.clone(),
                witness_repo,
                hearing_notification_service.clone(),
                qr.clone(),
                clock.clone(),
                court_tz,
            ),
            attendance_service: AttendanceService::new(
                hearing_repo,
                attendance_repo.clone(),
                case_repo.clone(),
                qr,
                clock,
                court_tz,
            ),
            absence_reason_service: AbsenceReasonService::new(
                reason_repo,
                attendance_repo,
                case_repo,
                user_repo,
                dispatcher,
            ),
            notification_service: NotificationService::new(notification_repo),
            settings_service: SettingsService::new(settings_repo),
            hearing_notification_service,
            cookie_secure: config.auth.cookie_secure,
        })
    }
}

/// Resolve the session token, from the cookie or a bearer header, to a user.
/// Invalid tokens are ignored; handlers that need a user reject the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        });

    if let Some(token) = token {
        match state.auth_service.authenticate(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring invalid session token"),
        }
    }

    next.run(req).await
}
