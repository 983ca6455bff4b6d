//! Notification delivery: SMTP via lettre, with a console fallback when no
//! credentials are configured.

use async_trait::async_trait;
use chrono::Local;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::NotifyConfig;
use crate::error::NotifyError;

/// Subject prefix on every outgoing notification.
const SUBJECT_PREFIX: &str = "[Career Agent]";

/// How a notification was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    EmailSent,
    LoggedToConsole,
    EmailFailed,
}

/// Outcome of one notification, returned to the model as the tool result.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationReceipt {
    pub status: DeliveryStatus,
    pub timestamp: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Delivers notifications to the represented user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification. Delivery failures are reported in the receipt.
    async fn notify(&self, subject: &str, body: &str) -> NotificationReceipt;
}

/// Email notifier; logs instead of sending when `config` is `None`.
pub struct EmailNotifier {
    config: Option<NotifyConfig>,
}

impl EmailNotifier {
    pub fn new(config: Option<NotifyConfig>) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }
}

fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Frame the notification body with a header and footer.
fn frame_body(timestamp: &str, body: &str) -> String {
    format!(
        "Career Assistant AI Agent Notification\n\
         ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\
         Time: {timestamp}\n\n\
         {body}\n\n\
         ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\
         This is an automated notification from your Career Assistant AI Agent.\n"
    )
}

/// Send an email via SMTP (blocking).
fn send_email(config: &NotifyConfig, subject: &str, body: &str) -> Result<(), NotifyError> {
    let email = Message::builder()
        .from(
            config
                .from_address
                .parse()
                .map_err(|e: lettre::address::AddressError| NotifyError::InvalidAddress {
                    address: config.from_address.clone(),
                    reason: e.to_string(),
                })?,
        )
        .to(config
            .to_address
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::InvalidAddress {
                address: config.to_address.clone(),
                reason: e.to_string(),
            })?)
        .subject(format!("{SUBJECT_PREFIX} {subject}"))
        .body(body.to_string())
        .map_err(|e| NotifyError::Build(e.to_string()))?;

    let creds = Credentials::new(
        config.from_address.clone(),
        config.password.expose_secret().to_string(),
    );

    let transport = SmtpTransport::starttls_relay(&config.smtp_host)
        .map_err(|e| NotifyError::Smtp(format!("SMTP relay error: {e}")))?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    transport
        .send(&email)
        .map_err(|e| NotifyError::Smtp(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, subject: &str, body: &str) -> NotificationReceipt {
        let timestamp = now_stamp();

        let Some(config) = self.config.clone() else {
            tracing::warn!("Email credentials not configured. Logging notification to console.");
            tracing::info!(timestamp = %timestamp, subject = %subject, body = %body, "NOTIFICATION");
            return NotificationReceipt {
                status: DeliveryStatus::LoggedToConsole,
                timestamp,
                subject: subject.to_string(),
                error: None,
            };
        };

        let framed = frame_body(&timestamp, body);
        let subject_owned = subject.to_string();
        let result =
            tokio::task::spawn_blocking(move || send_email(&config, &subject_owned, &framed)).await;

        let error = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(join_err) => Some(format!("delivery task failed: {join_err}")),
        };

        match error {
            None => {
                tracing::info!(subject = %subject, "Email sent successfully");
                NotificationReceipt {
                    status: DeliveryStatus::EmailSent,
                    timestamp,
                    subject: subject.to_string(),
                    error: None,
                }
            }
            Some(error) => {
                tracing::error!(subject = %subject, error = %error, "Failed to send email");
                tracing::info!(subject = %subject, body = %body, "FALLBACK NOTIFICATION");
                NotificationReceipt {
                    status: DeliveryStatus::EmailFailed,
                    timestamp,
                    subject: subject.to_string(),
                    error: Some(error),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_notifier_logs_to_console() {
        let notifier = EmailNotifier::new(None);
        assert!(!notifier.is_configured());
        let receipt = notifier.notify("New message from Acme", "Preview").await;
        assert_eq!(receipt.status, DeliveryStatus::LoggedToConsole);
        assert_eq!(receipt.subject, "New message from Acme");
        assert!(receipt.error.is_none());
    }

    #[test]
    fn receipt_serializes_status_snake_case() {
        let receipt = NotificationReceipt {
            status: DeliveryStatus::EmailFailed,
            timestamp: "2024-01-01 00:00:00".into(),
            subject: "s".into(),
            error: Some("boom".into()),
        };
        let v = serde_json::to_value(&receipt).unwrap();
        assert_eq!(v["status"], "email_failed");
        assert_eq!(v["error"], "boom");
    }

    #[test]
    fn framed_body_contains_timestamp_and_body() {
        let framed = frame_body("2024-05-01 10:00:00", "Hello");
        assert!(framed.contains("Time: 2024-05-01 10:00:00"));
        assert!(framed.contains("Hello"));
    }

    #[test]
    fn invalid_address_is_reported() {
        let config = NotifyConfig {
            from_address: "not an address".into(),
            password: secrecy::SecretString::from("pw"),
            to_address: "me@example.com".into(),
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
        };
        let err = send_email(&config, "s", "b").unwrap_err();
        assert!(matches!(err, NotifyError::InvalidAddress { .. }));
    }
}
