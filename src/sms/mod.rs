//! Outbound SMS.
//!
//! The request shapes mirror the messaging endpoint: a JSON body tagged by
//! `action` (`send`, `bulk` or `status`) dispatched to the provider client.

pub mod client;

pub use client::{SmsClient, SmsClientConfig, MAX_BULK_RECIPIENTS};

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS provider credential '{0}' is not configured")]
    MissingCredentials(&'static str),

    #[error("No recipients provided")]
    NoRecipients,

    #[error("Bulk send supports at most {max} recipients, got {count}")]
    BulkLimit { count: usize, max: usize },

    #[error("Invalid SMS request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to reach SMS provider: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("SMS provider error {status}: {message}")]
    Provider { status: u16, message: String },
}

impl SmsError {
    /// HTTP status a messaging endpoint would answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            SmsError::MissingCredentials(_) => 500,
            SmsError::NoRecipients | SmsError::BulkLimit { .. } | SmsError::InvalidRequest(_) => {
                400
            }
            SmsError::Timeout(_) => 504,
            SmsError::Transport(_) => 502,
            SmsError::Provider { status, .. } => *status,
        }
    }

    /// Error body in the endpoint's response shape.
    pub fn to_response(&self) -> Value {
        json!({ "success": false, "error": self.to_string() })
    }
}

/// A messaging request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum SmsAction {
    Send {
        to: String,
        message: String,
    },
    Bulk {
        recipients: Vec<String>,
        message: String,
    },
    Status {
        #[serde(alias = "messageSid")]
        message_sid: String,
    },
}

/// Execute a request and build the success response body.
pub async fn dispatch(
    client: &SmsClient,
    action: SmsAction,
    show_progress: bool,
) -> Result<Value, SmsError> {
    match action {
        SmsAction::Send { to, message } => {
            let receipt = client.send(&to, &message).await?;
            Ok(json!({
                "success": true,
                "messageSid": receipt.sid,
                "status": receipt.status,
            }))
        }
        SmsAction::Bulk {
            recipients,
            message,
        } => {
            let summary = client
                .send_bulk(&recipients, &message, show_progress)
                .await?;
            Ok(json!({
                "success": true,
                "sent": summary.sent,
                "failed": summary.failed,
                "results": summary.results,
            }))
        }
        SmsAction::Status { message_sid } => {
            let receipt = client.status(&message_sid).await?;
            Ok(json!({
                "success": true,
                "messageSid": receipt.sid,
                "status": receipt.status,
                "errorMessage": receipt.error_message,
            }))
        }
    }
}
