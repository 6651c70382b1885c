//! HTTP client for the sheet-import capability
//!
//! Read-only: fetches rows used to populate bulk-send recipient lists.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{AuthProvider, MailApiConfig, RowSource};

/// HTTP sheet import client
pub struct HttpSheetClient {
    config: MailApiConfig,
    client: Client,
    auth: Arc<dyn AuthProvider>,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    #[serde(default)]
    rows: Vec<HashMap<String, String>>,
}

impl HttpSheetClient {
    /// Create a new sheet client
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

#[async_trait]
impl RowSource for HttpSheetClient {
    async fn fetch_rows(&self, sheet_id: &str) -> anyhow::Result<Vec<HashMap<String, String>>> {
        let token = self.auth.token(false).await?;
        let url = format!("{}/sheets/{}/rows", self.config.base_url, sheet_id);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("sheet request failed with status {}", response.status());
        }

        let parsed: RowsResponse = response.json().await?;
        Ok(parsed.rows)
    }
}
