use crate::error::ReportError;
use crate::render::render_notice;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

/// Sends one HTML message to one recipient.
#[async_trait]
pub trait MailSink: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ReportError>;
}

/// SMTP mailer (STARTTLS relay with login credentials).
pub struct Mailer {
    from: String,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Mailer {
    pub fn new(host: &str, port: u16, user: &str, pass: &str, from: &str) -> Self {
        let transport = if !host.is_empty() && !user.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()
                .map(|builder| {
                    builder
                        .port(port)
                        .credentials(Credentials::new(user.to_string(), pass.to_string()))
                        .build()
                })
        } else {
            None
        };

        // Gmail-style relays accept the login as sender when none is set.
        let from = if from.is_empty() { user } else { from };

        Self {
            from: from.to_string(),
            transport,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some() && !self.from.is_empty()
    }
}

#[async_trait]
impl MailSink for Mailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ReportError> {
        let fail = |message: String| ReportError::SinkSend {
            recipient: to.to_string(),
            message,
        };
        let Some(ref transport) = self.transport else {
            return Err(fail("mail transport not configured".into()));
        };

        let email = Message::builder()
            .from(self.from.parse().map_err(|e| fail(format!("from address: {e}")))?)
            .to(to.parse().map_err(|e| fail(format!("to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| fail(format!("build email: {e}")))?;

        transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| fail(e.to_string()))
    }
}

/// Per-run mail outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

impl Delivery {
    pub fn all_sent(&self) -> bool {
        self.failed.is_empty() && !self.sent.is_empty()
    }
}

/// Send to every recipient in turn; one failure never stops the rest.
pub async fn deliver(mail: &dyn MailSink, recipients: &[String], subject: &str, html: &str) -> Delivery {
    let mut delivery = Delivery::default();
    if recipients.is_empty() {
        warn!("No mail recipients configured, skipping \"{subject}\"");
        return delivery;
    }

    for to in recipients {
        match mail.send(to, subject, html).await {
            Ok(()) => {
                info!("Email sent to {to}: {subject}");
                delivery.sent.push(to.clone());
            }
            Err(e) => {
                error!("Email send failed: {e}");
                delivery.failed.push(to.clone());
            }
        }
    }
    delivery
}

/// Failure notice carrying the error detail (and raw AI text when there is one).
pub async fn send_alert(mail: &dyn MailSink, recipients: &[String], subject: &str, detail: &str) -> Delivery {
    let html = render_notice(subject, detail);
    deliver(mail, recipients, subject, &html).await
}
