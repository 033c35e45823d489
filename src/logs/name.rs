//! Execution name resolution.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::LogUploadError;
use crate::provision::ExecutionToken;
use crate::runner::RuntimeConfig;

/// Resolves the human-readable name of the current execution.
#[async_trait]
pub trait ExecutionNameSource: Send + Sync {
    async fn resolve(&self) -> Result<String, LogUploadError>;
}

/// A name fixed up front.
#[derive(Debug, Clone)]
pub struct StaticExecutionName(String);

impl StaticExecutionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

#[async_trait]
impl ExecutionNameSource for StaticExecutionName {
    async fn resolve(&self) -> Result<String, LogUploadError> {
        if self.0.trim().is_empty() {
            return Err(LogUploadError::Resolution(
                "execution name is empty".to_string(),
            ));
        }
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ExecutionNameResponse {
    name: Option<String>,
}

/// Looks the name up on the control plane using the execution token.
pub struct ControlPlaneExecutionName {
    client: Client,
    endpoint: String,
    token_env: String,
    auth_scheme: String,
}

impl ControlPlaneExecutionName {
    pub fn new(config: &RuntimeConfig) -> Result<Self, LogUploadError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/execution-name",
                config.control_plane_url.trim_end_matches('/')
            ),
            token_env: config.token_env.clone(),
            auth_scheme: config.auth_scheme.clone(),
        })
    }
}

#[async_trait]
impl ExecutionNameSource for ControlPlaneExecutionName {
    async fn resolve(&self) -> Result<String, LogUploadError> {
        let token = ExecutionToken::from_env(&self.token_env).ok_or_else(|| {
            LogUploadError::Resolution(format!("{} is not set", self.token_env))
        })?;

        debug!(endpoint = %self.endpoint, "Resolving execution name");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                token.header_value(&self.auth_scheme),
            )
            .send()
            .await
            .map_err(|e| LogUploadError::Resolution(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LogUploadError::Resolution(format!(
                "control plane returned {}: {}",
                status, text
            )));
        }

        let parsed: ExecutionNameResponse = resp
            .json()
            .await
            .map_err(|e| LogUploadError::Resolution(e.to_string()))?;
        parsed
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| LogUploadError::Resolution("response has no name".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_name() {
        let source = StaticExecutionName::new("run-42");
        assert_eq!(source.resolve().await.unwrap(), "run-42");
    }

    #[tokio::test]
    async fn test_blank_static_name_fails() {
        let source = StaticExecutionName::new("  ");
        assert!(matches!(
            source.resolve().await,
            Err(LogUploadError::Resolution(_))
        ));
    }

    #[tokio::test]
    async fn test_control_plane_without_token() {
        let var = format!("READSIM_TEST_NAME_TOKEN_{}", uuid::Uuid::new_v4().simple());
        let config = RuntimeConfig::default()
            .with_control_plane("http://127.0.0.1:9")
            .with_token_env(var);
        let source = ControlPlaneExecutionName::new(&config).unwrap();

        match source.resolve().await {
            Err(LogUploadError::Resolution(msg)) => assert!(msg.contains("is not set")),
            other => panic!("expected resolution error, got {:?}", other),
        }
    }
}
