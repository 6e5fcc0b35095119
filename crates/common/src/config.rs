//! Application configuration.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

use crate::error::AppError;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Reminder scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// QR code configuration.
    #[serde(default)]
    pub qr: QrConfig,
    /// SMS provider configuration.
    #[serde(default)]
    pub sms: SmsSettings,
    /// Email provider configuration.
    #[serde(default)]
    pub email: EmailSettings,
    /// Outbound notification configuration.
    #[serde(default)]
    pub notifications: NotificationSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of the dashboard, used in email links.
    pub url: String,
    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing session tokens.
    pub jwt_secret: String,
    /// Session lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Whether the session cookie requires HTTPS.
    #[serde(default)]
    pub cookie_secure: bool,
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Whether the scheduler runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// IANA timezone the court operates in. "Today" is computed here.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Period between weekly/day-of scans, in seconds.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Local hour (0-23) of the daily post-hearing scan.
    #[serde(default = "default_post_hearing_hour")]
    pub post_hearing_hour: u32,
    /// Minutes that must pass after the hearing time before post-hearing analysis.
    #[serde(default = "default_post_hearing_cooldown_minutes")]
    pub post_hearing_cooldown_minutes: i64,
    /// Days before the hearing the weekly reminder goes out.
    #[serde(default = "default_weekly_lead_days")]
    pub weekly_lead_days: i64,
}

/// QR code configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QrConfig {
    /// Optional secret; when set, QR payloads are HMAC-signed and verified.
    #[serde(default)]
    pub signing_secret: Option<String>,
    /// Payloads are rejected this long after the hearing day.
    #[serde(default = "default_qr_max_age_days")]
    pub max_age_days: i64,
}

/// SMS provider configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmsSettings {
    /// Provider name: `twilio`, `log`, or `disabled`.
    #[serde(default)]
    pub provider: Option<String>,
    /// Twilio account SID.
    #[serde(default)]
    pub twilio_account_sid: Option<String>,
    /// Twilio auth token.
    #[serde(default)]
    pub twilio_auth_token: Option<String>,
    /// Sender phone number.
    #[serde(default)]
    pub from_number: Option<String>,
}

/// Email provider configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailSettings {
    /// Provider name: `smtp`, `mailgun`, `sendgrid`, `log`, or `disabled`.
    #[serde(default)]
    pub provider: Option<String>,
    /// From address.
    #[serde(default)]
    pub from_address: Option<String>,
    /// From display name.
    #[serde(default)]
    pub from_name: Option<String>,
    /// SMTP host.
    #[serde(default)]
    pub smtp_host: Option<String>,
    /// SMTP port.
    #[serde(default)]
    pub smtp_port: Option<u16>,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Use implicit TLS for SMTP (otherwise STARTTLS).
    #[serde(default)]
    pub smtp_tls: bool,
    /// Mailgun API key.
    #[serde(default)]
    pub mailgun_api_key: Option<String>,
    /// Mailgun sending domain.
    #[serde(default)]
    pub mailgun_domain: Option<String>,
    /// Use the Mailgun EU region.
    #[serde(default)]
    pub mailgun_eu_region: bool,
    /// `SendGrid` API key.
    #[serde(default)]
    pub sendgrid_api_key: Option<String>,
}

/// Outbound notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    /// Timeout for provider HTTP calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: default_timezone(),
            tick_interval_secs: default_tick_interval_secs(),
            post_hearing_hour: default_post_hearing_hour(),
            post_hearing_cooldown_minutes: default_post_hearing_cooldown_minutes(),
            weekly_lead_days: default_weekly_lead_days(),
        }
    }
}

impl SchedulerSettings {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz, AppError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| AppError::Config(format!("Invalid scheduler timezone: {e}")))
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            max_age_days: default_qr_max_age_days(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_token_ttl_hours() -> i64 {
    24 * 7
}

const fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

const fn default_tick_interval_secs() -> u64 {
    86_400
}

const fn default_post_hearing_hour() -> u32 {
    18
}

const fn default_post_hearing_cooldown_minutes() -> i64 {
    120
}

const fn default_weekly_lead_days() -> i64 {
    7
}

const fn default_qr_max_age_days() -> i64 {
    366
}

const fn default_request_timeout_secs() -> u64 {
    15
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `BAILIFF_ENV`)
    /// 3. Environment variables with `BAILIFF__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("BAILIFF_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BAILIFF")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("BAILIFF")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
