//! Recipient notification through an HTTP mail relay.

use chrono::{Datelike, NaiveDate, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;
use tracing::debug;

use blueprint_core::RecipientKey;
use blueprint_pipeline::{NotifyError, Notifier};

use crate::config::NotifySettings;

/// Subject and body of one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub text: String,
}

impl Message {
    /// The monthly announcement for `link`, dated by `today`.
    pub fn monthly(today: NaiveDate, link: &str) -> Self {
        let month = today.format("%B").to_string();
        Self {
            subject: format!("Your Monthly Blueprint - {month} {}", today.year()),
            text: format!(
                "Attached is your Infinite Blueprint for {month}. Feel free to ask any questions in the Domain discord. Enjoy!\n\n{link}"
            ),
        }
    }
}

/// Relay statuses that mean later sends will fail the same way.
pub fn is_rejection(status: StatusCode) -> bool {
    matches!(status.as_u16(), 401 | 403 | 422 | 429)
}

pub fn status_error(status: StatusCode, body: &str) -> NotifyError {
    let detail = format!("{status}: {body}");
    if is_rejection(status) {
        NotifyError::Rejected(detail)
    } else {
        NotifyError::Transient(detail)
    }
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct MailRelayNotifier {
    settings: NotifySettings,
}

impl MailRelayNotifier {
    pub fn new(settings: NotifySettings) -> Self {
        Self { settings }
    }
}

impl Notifier for MailRelayNotifier {
    fn notify(&self, recipient: &RecipientKey, link: &str) -> Result<(), NotifyError> {
        let message = Message::monthly(Utc::now().date_naive(), link);
        let client = Client::builder()
            .timeout(self.settings.timeout)
            .build()
            .map_err(|e| NotifyError::Transient(e.to_string()))?;

        let resp = client
            .post(&self.settings.endpoint)
            .bearer_auth(&self.settings.api_token)
            .json(&RelayRequest {
                from: &self.settings.sender,
                to: recipient.as_str(),
                subject: &message.subject,
                text: &message.text,
            })
            .send()
            .map_err(|e| NotifyError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(status_error(status, body.trim()));
        }
        debug!(to = %recipient.censored(), "notification accepted by relay");
        Ok(())
    }
}
