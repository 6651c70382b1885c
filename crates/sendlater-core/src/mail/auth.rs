//! Token provision and the durable reauthentication signal

use async_trait::async_trait;
use sendlater_common::config::MailConfig;
use sendlater_storage::models::AuthState;
use sendlater_storage::repository::AuthStateRepository;
use tracing::{info, warn};

use super::{AuthProvider, TransportError};

/// Environment variable consulted when no token is configured
const TOKEN_ENV_VAR: &str = "SENDLATER_MAIL_TOKEN";

/// Bearer token provider backed by configuration or the environment.
/// There is no browser to drive an OAuth flow from a headless worker,
/// so a missing token is reported as `AuthRequired` and the UI layer
/// is expected to reauthenticate out of band.
pub struct BearerTokenProvider {
    token: Option<String>,
}

impl BearerTokenProvider {
    /// Build from mail configuration, falling back to the environment
    pub fn from_config(config: &MailConfig) -> Self {
        let token = config
            .token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok());
        Self { token }
    }

    /// Build with a fixed token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

#[async_trait]
impl AuthProvider for BearerTokenProvider {
    async fn token(&self, _interactive: bool) -> Result<String, TransportError> {
        self.token.clone().ok_or_else(|| {
            TransportError::AuthRequired("no mail API token configured".to_string())
        })
    }
}

/// Durable needs-reauthentication signal. Raised by the scheduler and
/// bulk sender on `AuthRequired` outcomes; read by the UI layer.
pub struct AuthSignal {
    repo: AuthStateRepository,
}

impl AuthSignal {
    /// Create a new auth signal over its singleton row
    pub fn new(repo: AuthStateRepository) -> Self {
        Self { repo }
    }

    /// Raise the signal
    pub async fn raise(&self, reason: &str) -> anyhow::Result<()> {
        warn!(reason, "Raising reauthentication signal");
        self.repo.raise(reason).await?;
        Ok(())
    }

    /// Clear the signal after the user reauthenticated
    pub async fn clear(&self) -> anyhow::Result<()> {
        info!("Clearing reauthentication signal");
        self.repo.clear().await?;
        Ok(())
    }

    /// Current signal state
    pub async fn status(&self) -> anyhow::Result<AuthState> {
        Ok(self.repo.get().await?)
    }

    /// Whether reauthentication is currently required
    pub async fn needs_reauth(&self) -> anyhow::Result<bool> {
        Ok(self.repo.get().await?.needs_reauth)
    }
}
