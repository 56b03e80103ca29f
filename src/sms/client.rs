//! Twilio-compatible SMS client.
//!
//! Messages are created with a form-encoded `POST` to
//! `{base}/Accounts/{account}/Messages.json` using Basic auth, and looked up
//! with `GET {base}/Accounts/{account}/Messages/{sid}.json`.

use super::SmsError;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Most messages accepted by one bulk call.
pub const MAX_BULK_RECIPIENTS: usize = 50;

/// Connection settings for the provider.
#[derive(Debug, Clone)]
pub struct SmsClientConfig {
    pub base_url: String,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    /// Pause between consecutive bulk messages.
    pub bulk_delay: Duration,
    pub timeout: Duration,
}

impl From<&crate::config::SmsConfig> for SmsClientConfig {
    fn from(config: &crate::config::SmsConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            bulk_delay: Duration::from_millis(config.bulk_delay_ms),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

/// Message resource as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub sid: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Outcome for one recipient of a bulk send.
#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub to: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkSummary {
    pub sent: usize,
    pub failed: usize,
    pub results: Vec<BulkResult>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Authenticated client for one provider account.
pub struct SmsClient {
    http_client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    bulk_delay: Duration,
    timeout: Duration,
}

impl SmsClient {
    /// Create a client. Fails if any credential is missing.
    pub fn new(config: SmsClientConfig) -> Result<Self, SmsError> {
        let account_sid = required(config.account_sid, "account_sid")?;
        let auth_token = required(config.auth_token, "auth_token")?;
        let from_number = required(config.from_number, "from_number")?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SmsError::Transport)?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
            from_number,
            bulk_delay: config.bulk_delay,
            timeout: config.timeout,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid)
    }

    fn message_url(&self, message_sid: &str) -> String {
        format!(
            "{}/Accounts/{}/Messages/{}.json",
            self.base_url, self.account_sid, message_sid
        )
    }

    fn map_transport(&self, e: reqwest::Error) -> SmsError {
        if e.is_timeout() {
            SmsError::Timeout(self.timeout.as_secs())
        } else {
            SmsError::Transport(e)
        }
    }

    /// Send one message.
    pub async fn send(&self, to: &str, message: &str) -> Result<MessageReceipt, SmsError> {
        validate(to, message)?;
        debug!("Sending SMS to {}", to);

        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", to),
                ("From", self.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let receipt = parse_receipt(response).await?;
        info!("SMS to {} accepted: {} ({})", to, receipt.sid, receipt.status);
        Ok(receipt)
    }

    /// Send the same message to every recipient, one after another.
    ///
    /// Individual failures are recorded and do not stop the batch.
    pub async fn send_bulk(
        &self,
        recipients: &[String],
        message: &str,
        show_progress: bool,
    ) -> Result<BulkSummary, SmsError> {
        if recipients.is_empty() {
            return Err(SmsError::NoRecipients);
        }
        if recipients.len() > MAX_BULK_RECIPIENTS {
            return Err(SmsError::BulkLimit {
                count: recipients.len(),
                max: MAX_BULK_RECIPIENTS,
            });
        }
        if message.trim().is_empty() {
            return Err(SmsError::InvalidRequest("message is empty".to_string()));
        }

        let progress = show_progress.then(|| progress_bar(recipients.len() as u64));
        let mut results = Vec::with_capacity(recipients.len());

        for (idx, to) in recipients.iter().enumerate() {
            if idx > 0 && !self.bulk_delay.is_zero() {
                tokio::time::sleep(self.bulk_delay).await;
            }

            let result = match self.send(to, message).await {
                Ok(receipt) => BulkResult {
                    to: to.clone(),
                    success: true,
                    sid: Some(receipt.sid),
                    status: Some(receipt.status),
                    error: None,
                },
                Err(e) => {
                    warn!("SMS to {} failed: {}", to, e);
                    BulkResult {
                        to: to.clone(),
                        success: false,
                        sid: None,
                        status: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let sent = results.iter().filter(|r| r.success).count();
        let failed = results.len() - sent;
        info!("Bulk SMS complete: {} sent, {} failed", sent, failed);

        Ok(BulkSummary {
            sent,
            failed,
            results,
        })
    }

    /// Look up a message by provider id.
    pub async fn status(&self, message_sid: &str) -> Result<MessageReceipt, SmsError> {
        if message_sid.trim().is_empty() {
            return Err(SmsError::InvalidRequest("message sid is empty".to_string()));
        }

        let response = self
            .http_client
            .get(self.message_url(message_sid))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        parse_receipt(response).await
    }

    /// Look up several messages concurrently, results in input order.
    pub async fn statuses(&self, message_sids: &[String]) -> Vec<Result<MessageReceipt, SmsError>> {
        join_all(message_sids.iter().map(|sid| self.status(sid))).await
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, SmsError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(SmsError::MissingCredentials(field))
}

fn validate(to: &str, message: &str) -> Result<(), SmsError> {
    if to.trim().is_empty() {
        return Err(SmsError::InvalidRequest("recipient is empty".to_string()));
    }
    if message.trim().is_empty() {
        return Err(SmsError::InvalidRequest("message is empty".to_string()));
    }
    Ok(())
}

async fn parse_receipt(response: reqwest::Response) -> Result<MessageReceipt, SmsError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SmsError::Provider {
            status: status.as_u16(),
            message: provider_message(&body),
        });
    }

    response.json().await.map_err(SmsError::Transport)
}

/// Error text from a provider error body, or the raw body.
fn provider_message(body: &str) -> String {
    match serde_json::from_str::<ProviderError>(body) {
        Ok(err) => err.message,
        Err(_) => body.trim().to_string(),
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
