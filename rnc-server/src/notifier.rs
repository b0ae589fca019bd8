//! E-mail notification on open and close
//!
//! Sending is best effort. The record is already saved when a notification
//! goes out, so every failure is logged and reported as a [`NotifyOutcome`]
//! instead of an error.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rnc_common::config::MailConfig;
use rnc_common::db::NonConformity;
use serde::Serialize;
use tracing::{info, warn};

/// Which lifecycle event a message announces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Opened,
    Closed,
}

impl Event {
    fn tag(self) -> &'static str {
        match self {
            Event::Opened => "RNC OPENED",
            Event::Closed => "RNC CLOSED",
        }
    }
}

/// Result of a notification attempt, returned to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NotifyOutcome {
    Sent { recipients: usize },
    /// Mail is not configured
    Skipped,
    Failed { message: String },
}

/// Mail sender built once from configuration
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    mail: Option<MailConfig>,
    public_base_url: Option<String>,
}

impl Notifier {
    /// Disabled unless relay host, sender and recipients are all configured
    pub fn from_config(mail: &MailConfig) -> Self {
        if mail.is_enabled() {
            info!(
                "E-mail notification enabled ({} recipient(s))",
                mail.to.len()
            );
        } else {
            info!("E-mail notification disabled (relay, sender or recipients not configured)");
        }

        Self {
            mail: mail.is_enabled().then(|| mail.clone()),
            public_base_url: None,
        }
    }

    /// Link records in message bodies to this URL
    pub fn with_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.mail.is_some()
    }

    pub async fn notify_opened(&self, record: &NonConformity) -> NotifyOutcome {
        self.notify(Event::Opened, record).await
    }

    pub async fn notify_closed(&self, record: &NonConformity) -> NotifyOutcome {
        self.notify(Event::Closed, record).await
    }

    async fn notify(&self, event: Event, record: &NonConformity) -> NotifyOutcome {
        let Some(mail) = &self.mail else {
            return NotifyOutcome::Skipped;
        };

        let (subject, body) = compose(event, record, self.public_base_url.as_deref());
        match send(mail, subject, body).await {
            Ok(()) => {
                info!(
                    "Notification for RNC {} sent to {} recipient(s)",
                    record.rnc_number,
                    mail.to.len()
                );
                NotifyOutcome::Sent {
                    recipients: mail.to.len(),
                }
            }
            Err(message) => {
                warn!(
                    "Notification for RNC {} not sent: {}",
                    record.rnc_number, message
                );
                NotifyOutcome::Failed { message }
            }
        }
    }
}

async fn send(mail: &MailConfig, subject: String, body: String) -> Result<(), String> {
    let host = mail.smtp_host.as_deref().unwrap_or_default().trim();
    let from: Mailbox = mail
        .from
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|e| format!("invalid sender address: {}", e))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);
    for to in &mail.to {
        let mailbox: Mailbox = to
            .parse()
            .map_err(|e| format!("invalid recipient address {}: {}", to, e))?;
        builder = builder.to(mailbox);
    }
    let message = builder
        .body(body)
        .map_err(|e| format!("could not build message: {}", e))?;

    let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        .map_err(|e| format!("invalid relay {}: {}", host, e))?
        .port(mail.smtp_port);
    if let (Some(user), Some(password)) = (&mail.smtp_user, &mail.smtp_password) {
        transport = transport.credentials(Credentials::new(
            user.clone(),
            password.expose().to_string(),
        ));
    }

    transport
        .build()
        .send(message)
        .await
        .map(|_| ())
        .map_err(|e| format!("relay {}:{} refused delivery: {}", host, mail.smtp_port, e))
}

/// Subject and plain-text body for an event
pub fn compose(event: Event, record: &NonConformity, base_url: Option<&str>) -> (String, String) {
    let subject = format!(
        "[{}] Nº {} — {}",
        event.tag(),
        record.rnc_number,
        record.title
    );

    let dash = |s: &str| {
        if s.trim().is_empty() {
            "-".to_string()
        } else {
            s.to_string()
        }
    };

    let mut lines = vec![
        format!("RNC Nº: {}", record.rnc_number),
        format!("Title: {}", dash(&record.title)),
        format!(
            "Date: {}",
            record
                .occurred_on
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
        format!("Issuer: {}", dash(&record.issuer)),
        format!("Area: {}", dash(&record.area)),
        format!("Project: {}", record.project_code.as_deref().unwrap_or("-")),
        format!("Inspector: {}", dash(&record.inspector)),
        format!(
            "Severity: {}",
            record.severity.map(|s| s.as_str()).unwrap_or("-")
        ),
        format!("Category: {}", dash(&record.category)),
        format!("Status: {}", record.status),
        String::new(),
        "Description:".to_string(),
        record.description.clone(),
    ];

    if event == Event::Closed {
        lines.push(String::new());
        lines.push(format!(
            "Closed by: {}",
            record.closed_by.as_deref().unwrap_or("-")
        ));
        lines.push(format!(
            "Effectiveness: {}",
            record
                .effectiveness
                .map(|e| e.as_str())
                .unwrap_or("-")
        ));
        lines.push("Closing notes:".to_string());
        lines.push(record.closing_notes.clone().unwrap_or_default());
    }

    if let Some(url) = base_url {
        lines.push(String::new());
        lines.push(format!("Open the register: {}", url));
    }

    (subject, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rnc_common::config::Secret;
    use rnc_common::db::Effectiveness;
    use rnc_common::Status;

    fn record() -> NonConformity {
        NonConformity {
            id: 1,
            rnc_number: "2024-007".to_string(),
            occurred_on: None,
            issuer: "Ana".to_string(),
            area: String::new(),
            project_code: Some("PEP-12 — Upgrade".to_string()),
            title: "Loose guardrail".to_string(),
            inspector: String::new(),
            description: "Guardrail bolts missing".to_string(),
            references: String::new(),
            cause: String::new(),
            process: String::new(),
            origin: String::new(),
            corrective_action: String::new(),
            severity: None,
            category: String::new(),
            action_owner: String::new(),
            status: Status::Open,
            opened_at: None,
            closed_at: None,
            closed_by: None,
            closing_notes: None,
            effectiveness: None,
            reopened_at: None,
            reopened_by: None,
            reopening_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
        }
    }

    #[test]
    fn test_opened_message() {
        let (subject, body) = compose(Event::Opened, &record(), Some("https://rnc.example.com"));
        assert_eq!(subject, "[RNC OPENED] Nº 2024-007 — Loose guardrail");
        assert!(body.contains("Project: PEP-12 — Upgrade"));
        assert!(body.contains("Area: -"));
        assert!(body.contains("https://rnc.example.com"));
        assert!(!body.contains("Closing notes"));
    }

    #[test]
    fn test_closed_message_has_closing_block() {
        let mut r = record();
        r.status = Status::Closed;
        r.closed_by = Some("Carla".to_string());
        r.closing_notes = Some("Bolts replaced".to_string());
        r.effectiveness = Some(Effectiveness::Effective);

        let (subject, body) = compose(Event::Closed, &r, None);
        assert!(subject.starts_with("[RNC CLOSED] Nº 2024-007"));
        assert!(body.contains("Closed by: Carla"));
        assert!(body.contains("Effectiveness: effective"));
        assert!(body.contains("Bolts replaced"));
        assert!(!body.contains("Open the register"));
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_skips() {
        let notifier = Notifier::from_config(&MailConfig::default());
        assert!(!notifier.is_enabled());
        assert_eq!(notifier.notify_opened(&record()).await, NotifyOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_unreachable_relay_reports_failure() {
        let mail = MailConfig {
            smtp_host: Some("127.0.0.1".to_string()),
            smtp_port: 1,
            smtp_user: Some("user".to_string()),
            smtp_password: Some(Secret::new("pw")),
            from: Some("rnc@example.com".to_string()),
            to: vec!["quality@example.com".to_string()],
        };
        let notifier = Notifier::from_config(&mail);
        assert!(notifier.is_enabled());

        let outcome = notifier.notify_closed(&record()).await;
        assert!(matches!(outcome, NotifyOutcome::Failed { .. }), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_invalid_sender_reports_failure() {
        let mail = MailConfig {
            smtp_host: Some("smtp.example.com".to_string()),
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            from: Some("not an address".to_string()),
            to: vec!["quality@example.com".to_string()],
        };
        let outcome = Notifier::from_config(&mail).notify_opened(&record()).await;
        match outcome {
            NotifyOutcome::Failed { message } => assert!(message.contains("sender")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
