//! SMTP delivery through lettre's `AsyncSmtpTransport`.

use crate::core::{MailTransport, OutgoingMail};
use crate::utils::error::{NotifyError, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upgrade with STARTTLS; off for local relays such as Mailpit.
    pub starttls: bool,
}

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    pub fn new(settings: &SmtpSettings, from_address: &str) -> Result<Self> {
        let from: Mailbox = from_address.parse()?;

        let mut builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };
        builder = builder.port(settings.port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

/// Builds the multipart/alternative message for one notification.
pub fn build_message(from: &Mailbox, mail: &OutgoingMail) -> Result<Message> {
    if mail.to.is_empty() {
        return Err(NotifyError::mail("no recipients"));
    }

    let mut builder = Message::builder().from(from.clone()).subject(&mail.subject);
    for address in &mail.to {
        builder = builder.to(address.trim().parse()?);
    }
    for address in &mail.cc {
        builder = builder.cc(address.trim().parse()?);
    }
    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(reply_to.trim().parse()?);
    }

    let message = builder.multipart(
        MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(mail.text_body.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(mail.html_body.clone()),
            ),
    )?;
    Ok(message)
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = build_message(&self.from, mail)?;
        self.transport.send(message).await?;
        tracing::debug!(recipients = mail.to.len(), cc = mail.cc.len(), "SMTP message accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &[&str]) -> OutgoingMail {
        OutgoingMail {
            to: to.iter().map(|s| s.to_string()).collect(),
            cc: vec!["lead@example.org".to_string()],
            reply_to: Some("lead@example.org".to_string()),
            subject: "AEP Placement Transition Plan".to_string(),
            text_body: "plain".to_string(),
            html_body: "<p>html</p>".to_string(),
        }
    }

    fn sender() -> Mailbox {
        "notify@example.org".parse().unwrap()
    }

    #[test]
    fn test_build_message_headers() {
        let message = build_message(&sender(), &mail(&["a@example.org", "b@example.org"])).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("To: a@example.org, b@example.org"));
        assert!(formatted.contains("Cc: lead@example.org"));
        assert!(formatted.contains("Reply-To: lead@example.org"));
        assert!(formatted.contains("Subject: AEP Placement Transition Plan"));
        assert!(formatted.contains("multipart/alternative"));
    }

    #[test]
    fn test_empty_recipient_list_is_rejected() {
        let err = build_message(&sender(), &mail(&[])).unwrap_err();
        assert!(matches!(err, NotifyError::MailError { .. }));
    }

    #[test]
    fn test_invalid_recipient_is_a_mail_error() {
        let err = build_message(&sender(), &mail(&["not an address"])).unwrap_err();
        assert!(matches!(err, NotifyError::MailError { .. }));
    }

    #[test]
    fn test_transport_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailTransport>();
    }
}
