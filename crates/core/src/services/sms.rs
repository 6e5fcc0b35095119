//! Outbound SMS.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use bailiff_common::{AppError, AppResult, config::SmsSettings};

/// Something that can deliver a text message.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Provider name reported in delivery results.
    fn provider(&self) -> &'static str;

    /// Send `body` to `to` (E.164). Returns the provider's message ID.
    async fn send(&self, to: &str, body: &str) -> AppResult<String>;
}

/// Twilio REST API sender.
#[derive(Clone)]
pub struct TwilioSms {
    account_sid: String,
    auth_token: String,
    from_number: String,
    http_client: reqwest::Client,
}

#[derive(Deserialize)]
struct TwilioMessage {
    sid: String,
}

impl TwilioSms {
    /// Create a Twilio sender.
    #[must_use]
    pub const fn new(
        account_sid: String,
        auth_token: String,
        from_number: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            http_client,
        }
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    fn provider(&self) -> &'static str {
        "twilio"
    }

    #[tracing::instrument(skip(self, body))]
    async fn send(&self, to: &str, body: &str) -> AppResult<String> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", self.from_number.as_str()),
                ("To", to),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Twilio request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Twilio API error ({status}): {text}"
            )));
        }

        let message: TwilioMessage = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Twilio response unreadable: {e}")))?;

        tracing::info!(to = to, sid = %message.sid, "SMS sent");
        Ok(message.sid)
    }
}

/// Logs messages instead of sending them. For development.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSms;

#[async_trait]
impl SmsSender for LogSms {
    fn provider(&self) -> &'static str {
        "log"
    }

    async fn send(&self, to: &str, body: &str) -> AppResult<String> {
        tracing::info!(to = to, body = body, "SMS (log provider)");
        Ok(format!("log-{}", uuid::Uuid::new_v4().simple()))
    }
}

/// Build the configured SMS sender. `None` means SMS is off.
pub fn sms_sender_from_config(
    settings: &SmsSettings,
    http_client: &reqwest::Client,
) -> AppResult<Option<Arc<dyn SmsSender>>> {
    match settings.provider.as_deref() {
        None | Some("" | "disabled") => Ok(None),
        Some("log") => Ok(Some(Arc::new(LogSms))),
        Some("twilio") => {
            let (Some(sid), Some(token), Some(from)) = (
                settings.twilio_account_sid.clone(),
                settings.twilio_auth_token.clone(),
                settings.from_number.clone(),
            ) else {
                return Err(AppError::Config(
                    "Twilio requires twilio_account_sid, twilio_auth_token and from_number"
                        .to_string(),
                ));
            };
            Ok(Some(Arc::new(TwilioSms::new(
                sid,
                token,
                from,
                http_client.clone(),
            ))))
        }
        Some(other) => Err(AppError::Config(format!("Unknown SMS provider: {other}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_provider() {
        let client = reqwest::Client::new();
        let sender = sms_sender_from_config(&SmsSettings::default(), &client).unwrap();
        assert!(sender.is_none());
    }

    #[test]
    fn test_twilio_requires_credentials() {
        let settings = SmsSettings {
            provider: Some("twilio".to_string()),
            ..SmsSettings::default()
        };
        let client = reqwest::Client::new();
        assert!(matches!(
            sms_sender_from_config(&settings, &client),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_log_provider() {
        let settings = SmsSettings {
            provider: Some("log".to_string()),
            ..SmsSettings::default()
        };
        let client = reqwest::Client::new();
        let sender = sms_sender_from_config(&settings, &client).unwrap().unwrap();
        assert_eq!(sender.provider(), "log");
        assert!(sender.send("+15550000000", "hi").await.unwrap().starts_with("log-"));
    }
}
