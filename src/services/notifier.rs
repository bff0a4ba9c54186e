use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::NotifyError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Delivers a message to a user. Failures are always surfaced as errors.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, message: &Message) -> Result<(), NotifyError>;
}

/// Used when no mail relay is configured: the message is only logged.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, message: &Message) -> Result<(), NotifyError> {
        tracing::info!(
            to,
            subject = %message.subject,
            text = %message.text,
            "email simulation (no mail relay configured)"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: String,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

/// Posts messages as JSON to an HTTP mail relay.
#[derive(Clone)]
pub struct MailApiNotifier {
    http: Client,
    url: String,
    api_key: String,
    from_name: String,
    from_email: String,
}

impl MailApiNotifier {
    pub fn new(
        url: String,
        api_key: String,
        from_name: String,
        from_email: String,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            url,
            api_key,
            from_name,
            from_email,
        })
    }
}

#[async_trait]
impl Notifier for MailApiNotifier {
    async fn send(&self, to: &str, message: &Message) -> Result<(), NotifyError> {
        let body = RelayRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to,
            subject: &message.subject,
            text: &message.text,
            html: message.html.as_deref(),
        };

        let mut req = self.http.post(&self.url).json(&body);
        if !self.api_key.trim().is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }

        tracing::debug!(to, subject = %message.subject, "mail relay accepted message");
        Ok(())
    }
}
