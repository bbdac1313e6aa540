use crate::core::{MailTransport, OutgoingMail};
use crate::utils::error::{NotifyError, Result};
use async_trait::async_trait;

/// Logs each message instead of delivering it. Used for `--dry-run`.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyTransport;

#[async_trait]
impl MailTransport for LogOnlyTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        if mail.to.is_empty() {
            return Err(NotifyError::mail("no recipients"));
        }
        tracing::info!(
            to = %mail.to.join(", "),
            cc = %mail.cc.join(", "),
            subject = %mail.subject,
            "Dry run: message not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: Vec<String>) -> OutgoingMail {
        OutgoingMail {
            to,
            cc: Vec::new(),
            reply_to: None,
            subject: "subject".to_string(),
            text_body: "text".to_string(),
            html_body: "<p>html</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_succeeds_without_delivery() {
        let result = LogOnlyTransport.send(&mail(vec!["a@example.org".to_string()])).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_rejects_empty_recipients() {
        assert!(LogOnlyTransport.send(&mail(Vec::new())).await.is_err());
    }
}
