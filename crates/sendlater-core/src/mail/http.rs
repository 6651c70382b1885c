//! HTTP client for the external mail API
//!
//! Speaks the provider's REST surface: raw sends, sent-message listing,
//! and message detail. Auth is a bearer token from the injected
//! [`AuthProvider`]; 401/403 responses classify as `AuthRequired`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use sendlater_common::config::MailConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{
    AuthProvider, HistoryEntry, MailHistory, MailTransport, MessageDetail, SendReceipt,
    TransportError,
};

/// Mail API client configuration
#[derive(Debug, Clone)]
pub struct MailApiConfig {
    /// Base URL, e.g. `https://mail.googleapis.com/v1/users/me`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl From<&MailConfig> for MailApiConfig {
    fn from(config: &MailConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// HTTP mail API client
pub struct HttpMailClient {
    config: MailApiConfig,
    client: Client,
    auth: Arc<dyn AuthProvider>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    raw: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMessage {
    id: String,
    #[serde(default)]
    internal_date: i64,
    #[serde(default)]
    headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    id: String,
    #[serde(default)]
    internal_date: i64,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: MessagePayload,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: HashMap<String, String>,
}

impl HttpMailClient {
    /// Create a new mail API client
    pub fn new(config: MailApiConfig, auth: Arc<dyn AuthProvider>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            auth,
        }
    }
}

fn timestamp_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> &'a str {
    headers.get(name).map(String::as_str).unwrap_or_default()
}

#[async_trait]
impl MailTransport for HttpMailClient {
    async fn send_raw(&self, raw_base64url: &str) -> Result<SendReceipt, TransportError> {
        let token = self.auth.token(false).await?;
        let url = format!("{}/messages/send", self.config.base_url);

        debug!(url, bytes = raw_base64url.len(), "Submitting message to mail API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&SendRequest { raw: raw_base64url })
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::AuthRequired(format!(
                "mail API rejected credentials ({}): {}",
                status, body
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to parse send response: {}", e)))?;

        Ok(SendReceipt { id: parsed.id })
    }
}

#[async_trait]
impl MailHistory for HttpMailClient {
    async fn list_sent(&self, query: &str, limit: usize) -> anyhow::Result<Vec<HistoryEntry>> {
        let token = self.auth.token(false).await?;
        let url = format!("{}/messages", self.config.base_url);
        let max_results = limit.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("history request failed with status {}", response.status());
        }

        let parsed: ListResponse = response.json().await?;

        Ok(parsed
            .messages
            .into_iter()
            .map(|m| HistoryEntry {
                to: header(&m.headers, "To").to_string(),
                subject: header(&m.headers, "Subject").to_string(),
                sent_at: timestamp_from_millis(m.internal_date),
                id: m.id,
            })
            .collect())
    }

    async fn get_message(&self, id: &str) -> anyhow::Result<Option<MessageDetail>> {
        let token = self.auth.token(false).await?;
        let url = format!("{}/messages/{}", self.config.base_url, id);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            anyhow::bail!("message request failed with status {}", response.status());
        }

        let parsed: MessageResponse = response.json().await?;

        Ok(Some(MessageDetail {
            to: header(&parsed.payload.headers, "To").to_string(),
            subject: header(&parsed.payload.headers, "Subject").to_string(),
            snippet: parsed.snippet,
            sent_at: timestamp_from_millis(parsed.internal_date),
            id: parsed.id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::BearerTokenProvider;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpMailClient {
        HttpMailClient::new(
            MailApiConfig {
                base_url: server.uri(),
                timeout_secs: 5,
            },
            Arc::new(BearerTokenProvider::with_token("test-token")),
        )
    }

    #[tokio::test]
    async fn test_send_raw_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages/send"))
            .and(header_matcher("authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({ "raw": "SGVsbG8" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m-42"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let receipt = client.send_raw("SGVsbG8").await.unwrap();
        assert_eq!(receipt.id, "m-42");
    }

    #[tokio::test]
    async fn test_send_raw_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages/send"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.send_raw("SGVsbG8").await.unwrap_err();
        assert!(matches!(err, TransportError::AuthRequired(_)));
    }

    #[tokio::test]
    async fn test_send_raw_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages/send"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.send_raw("SGVsbG8").await.unwrap_err();
        match err {
            TransportError::Http { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "backend unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_sent_maps_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [
                    {
                        "id": "m-1",
                        "internalDate": 1_700_000_000_000_i64,
                        "headers": { "To": "a@x.com", "Subject": "Hello" }
                    }
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entries = client.list_sent("in:sent", 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "m-1");
        assert_eq!(entries[0].to, "a@x.com");
        assert_eq!(entries[0].subject, "Hello");
    }

    #[tokio::test]
    async fn test_get_message_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/messages/m-404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.get_message("m-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_message_detail() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/messages/m-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m-7",
                "internalDate": 1_700_000_000_000_i64,
                "snippet": "Just checking in",
                "payload": { "headers": { "To": "b@y.com", "Subject": "Ping" } }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let detail = client.get_message("m-7").await.unwrap().unwrap();
        assert_eq!(detail.snippet, "Just checking in");
        assert_eq!(detail.subject, "Ping");
    }
}
