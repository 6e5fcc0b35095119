//! Email notification service.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};
use serde::Deserialize;

use bailiff_common::{AppError, AppResult, config::EmailSettings};

/// Email provider configuration.
#[derive(Debug, Clone)]
pub enum EmailProvider {
    /// SMTP configuration
    Smtp(SmtpConfig),
    /// SendGrid
    SendGrid(SendGridConfig),
    /// Mailgun
    Mailgun(MailgunConfig),
    /// Log only
    Log,
}

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP host
    pub host: String,
    /// SMTP port
    pub port: u16,
    /// Implicit TLS; otherwise STARTTLS
    pub use_tls: bool,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
}

/// SendGrid configuration.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    /// SendGrid API key
    pub api_key: String,
}

/// Mailgun configuration.
#[derive(Debug, Clone)]
pub struct MailgunConfig {
    /// Mailgun API key
    pub api_key: String,
    /// Mailgun domain
    pub domain: String,
    /// Use EU region
    pub eu_region: bool,
}

/// Email configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Email provider
    pub provider: EmailProvider,
    /// From address
    pub from_address: String,
    /// From name
    pub from_name: String,
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: String,
    /// HTML body (optional)
    pub html_body: Option<String>,
}

/// Something that can deliver an email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Provider name reported in delivery results.
    fn provider(&self) -> &'static str;

    /// Send a message. Returns the provider's message ID.
    async fn send(&self, message: EmailMessage) -> AppResult<String>;
}

/// Email service.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    http_client: reqwest::Client,
}

impl EmailService {
    /// Create a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Build the configured email sender. `None` means email is off.
    pub fn from_settings(
        settings: &EmailSettings,
        http_client: &reqwest::Client,
    ) -> AppResult<Option<Arc<dyn EmailSender>>> {
        let missing = |field: &str| AppError::Config(format!("Email provider requires {field}"));

        let provider = match settings.provider.as_deref() {
            None | Some("" | "disabled") => return Ok(None),
            Some("log") => EmailProvider::Log,
            Some("smtp") => EmailProvider::Smtp(SmtpConfig {
                host: settings.smtp_host.clone().ok_or_else(|| missing("smtp_host"))?,
                port: settings
                    .smtp_port
                    .unwrap_or(if settings.smtp_tls { 465 } else { 587 }),
                use_tls: settings.smtp_tls,
                username: settings.smtp_username.clone(),
                password: settings.smtp_password.clone(),
            }),
            Some("sendgrid") => EmailProvider::SendGrid(SendGridConfig {
                api_key: settings
                    .sendgrid_api_key
                    .clone()
                    .ok_or_else(|| missing("sendgrid_api_key"))?,
            }),
            Some("mailgun") => EmailProvider::Mailgun(MailgunConfig {
                api_key: settings
                    .mailgun_api_key
                    .clone()
                    .ok_or_else(|| missing("mailgun_api_key"))?,
                domain: settings
                    .mailgun_domain
                    .clone()
                    .ok_or_else(|| missing("mailgun_domain"))?,
                eu_region: settings.mailgun_eu_region,
            }),
            Some(other) => {
                return Err(AppError::Config(format!("Unknown email provider: {other}")));
            }
        };

        let config = EmailConfig {
            provider,
            from_address: settings
                .from_address
                .clone()
                .unwrap_or_else(|| "noreply@localhost".to_string()),
            from_name: settings
                .from_name
                .clone()
                .unwrap_or_else(|| "Court Attendance".to_string()),
        };

        Ok(Some(Arc::new(Self::new(config, http_client.clone()))))
    }

    /// Render a notification into an email.
    #[must_use]
    pub fn render_notification(
        to: &str,
        title: &str,
        body: &str,
        organisation: &str,
        dashboard_url: &str,
    ) -> EmailMessage {
        let text_body = format!(
            "{body}\n\nOpen the dashboard for details: {dashboard_url}\n\n-- {organisation}"
        );
        let html_body = wrap_html(
            &format!(
                "<h2>{}</h2><p>{}</p><p><a href=\"{}\">Open the dashboard</a></p>",
                escape_html(title),
                escape_html(body),
                dashboard_url
            ),
            organisation,
            dashboard_url,
        );

        EmailMessage {
            to: to.to_string(),
            subject: format!("[{organisation}] {title}"),
            text_body,
            html_body: Some(html_body),
        }
    }

    async fn send_smtp(&self, smtp: &SmtpConfig, message: EmailMessage) -> AppResult<String> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_address)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid from address: {e}")))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::ExternalService(format!("Invalid recipient address: {e}")))?;

        let domain = self
            .config
            .from_address
            .rsplit('@')
            .next()
            .unwrap_or("localhost");
        let message_id = format!("<{}@{}>", uuid::Uuid::new_v4().simple(), domain);

        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject)
            .message_id(Some(message_id.clone()));
        let email = match message.html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                message.text_body,
                html,
            )),
            None => builder.body(message.text_body),
        }
        .map_err(|e| AppError::ExternalService(format!("Failed to build email: {e}")))?;

        let mut transport = if smtp.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
        }
        .map_err(|e| AppError::ExternalService(format!("SMTP setup failed: {e}")))?
        .port(smtp.port);

        if let (Some(user), Some(pass)) = (&smtp.username, &smtp.password) {
            transport = transport.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport
            .build()
            .send(email)
            .await
            .map_err(|e| AppError::ExternalService(format!("SMTP send failed: {e}")))?;

        Ok(message_id)
    }

    async fn send_sendgrid(&self, sg: &SendGridConfig, message: EmailMessage) -> AppResult<String> {
        let mut content = vec![serde_json::json!({"type": "text/plain", "value": message.text_body})];
        if let Some(html) = message.html_body {
            content.push(serde_json::json!({"type": "text/html", "value": html}));
        }

        let body = serde_json::json!({
            "personalizations": [{
                "to": [{"email": message.to}]
            }],
            "from": {
                "email": self.config.from_address,
                "name": self.config.from_name
            },
            "subject": message.subject,
            "content": content
        });

        let response = self
            .http_client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&sg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("SendGrid request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "SendGrid API error ({status}): {error_text}"
            )));
        }

        Ok(response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| "sendgrid".to_string(), String::from))
    }

    async fn send_mailgun(&self, mg: &MailgunConfig, message: EmailMessage) -> AppResult<String> {
        let base_url = if mg.eu_region {
            "https://api.eu.mailgun.net"
        } else {
            "https://api.mailgun.net"
        };

        let mut form_params = vec![
            (
                "from",
                format!("{} <{}>", self.config.from_name, self.config.from_address),
            ),
            ("to", message.to),
            ("subject", message.subject),
            ("text", message.text_body),
        ];

        if let Some(html) = message.html_body {
            form_params.push(("html", html));
        }

        let response = self
            .http_client
            .post(format!("{}/v3/{}/messages", base_url, mg.domain))
            .basic_auth("api", Some(&mg.api_key))
            .form(&form_params)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Mailgun request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Mailgun API error ({status}): {error_text}"
            )));
        }

        #[derive(Deserialize)]
        struct MailgunResponse {
            id: Option<String>,
        }
        let result: MailgunResponse = response
            .json()
            .await
            .unwrap_or(MailgunResponse { id: None });
        Ok(result.id.unwrap_or_else(|| "mailgun".to_string()))
    }
}

#[async_trait]
impl EmailSender for EmailService {
    fn provider(&self) -> &'static str {
        match self.config.provider {
            EmailProvider::Smtp(_) => "smtp",
            EmailProvider::SendGrid(_) => "sendgrid",
            EmailProvider::Mailgun(_) => "mailgun",
            EmailProvider::Log => "log",
        }
    }

    #[tracing::instrument(skip(self, message), fields(to = %message.to, provider = self.provider()))]
    async fn send(&self, message: EmailMessage) -> AppResult<String> {
        match &self.config.provider {
            EmailProvider::Smtp(smtp) => self.send_smtp(smtp, message).await,
            EmailProvider::SendGrid(sg) => self.send_sendgrid(sg, message).await,
            EmailProvider::Mailgun(mg) => self.send_mailgun(mg, message).await,
            EmailProvider::Log => {
                tracing::info!(subject = %message.subject, "Email (log provider)");
                Ok(format!("log-{}", uuid::Uuid::new_v4().simple()))
            }
        }
    }
}

/// Wrap HTML content in a basic email template.
fn wrap_html(content: &str, organisation: &str, dashboard_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
        a {{ color: #1d4ed8; }}
    </style>
</head>
<body>
    {content}
    <hr style="margin-top: 40px; border: none; border-top: 1px solid #e9ecef;">
    <p style="font-size: 12px; color: #6c757d;">
        Sent by <a href="{dashboard_url}">{organisation}</a> court attendance tracking.
    </p>
</body>
</html>"#
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
