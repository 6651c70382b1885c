//! External mail capability seams
//!
//! The worker talks to its collaborators (mail send, sent-message
//! history, token acquisition, sheet import) through these traits; the
//! HTTP implementations live in [`http`] and [`sheets`].

mod auth;
mod http;
mod sheets;

pub use auth::{AuthSignal, BearerTokenProvider};
pub use http::{HttpMailClient, MailApiConfig};
pub use sheets::HttpSheetClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Transport-level failure of a capability call
#[derive(Error, Debug)]
pub enum TransportError {
    /// Token invalid, expired, or missing a required scope. Never
    /// retried automatically; surfaces the durable reauth signal.
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// Any non-2xx response that is not an auth failure
    #[error("mail API returned status {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),
}

/// Receipt for an accepted send
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Message id assigned by the external mail API
    pub id: String,
}

/// The mail-send capability: one raw, base64url-encoded message per call
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_raw(&self, raw_base64url: &str) -> Result<SendReceipt, TransportError>;
}

/// Sent-message listing entry (headers only; fetch the detail for the
/// message content)
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: String,
    pub to: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
}

/// Full message detail
#[derive(Debug, Clone)]
pub struct MessageDetail {
    pub id: String,
    pub to: String,
    pub subject: String,
    pub snippet: String,
    pub sent_at: DateTime<Utc>,
}

/// The sent-message history capability
#[async_trait]
pub trait MailHistory: Send + Sync {
    /// List previously sent messages matching a provider query
    async fn list_sent(&self, query: &str, limit: usize) -> anyhow::Result<Vec<HistoryEntry>>;

    /// Fetch one message; `None` when the id is unknown
    async fn get_message(&self, id: &str) -> anyhow::Result<Option<MessageDetail>>;
}

/// The token acquisition capability. `interactive` asks the identity
/// provider to involve the user; this worker has no UI to drive, so
/// implementations may ignore it and report `AuthRequired` instead.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn token(&self, interactive: bool) -> Result<String, TransportError>;
}

/// The sheet-import capability feeding bulk sends
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self, sheet_id: &str) -> anyhow::Result<Vec<HashMap<String, String>>>;
}
