//! Shared storage provisioning against the control plane.
//!
//! The provisioner reads the execution token from the environment, asks the
//! dispatcher for a fixed-size volume and hands back its identifier. It makes
//! exactly one request and performs no local I/O.

use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::runner::RuntimeConfig;

/// Opaque identifier of a provisioned shared volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeHandle(String);

impl VolumeHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Short-lived credential identifying the current execution.
#[derive(Clone)]
pub struct ExecutionToken(String);

impl ExecutionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Reads the token from `var`. Empty values count as missing.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|t| !t.is_empty())
            .map(Self)
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self, scheme: &str) -> String {
        format!("{} {}", scheme, self.0)
    }
}

// Never print the token itself.
impl fmt::Debug for ExecutionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExecutionToken(***)")
    }
}

#[derive(Debug, Serialize)]
struct ProvisionRequest {
    storage_gib: u64,
}

#[derive(Debug, Deserialize)]
struct ProvisionResponse {
    name: Option<String>,
}

/// Requests shared storage volumes from the control plane.
pub struct Provisioner {
    client: Client,
    endpoint: String,
    token_env: String,
    auth_scheme: String,
    storage_gib: u64,
}

impl Provisioner {
    /// Creates a provisioner from the runtime configuration.
    pub fn new(config: &RuntimeConfig) -> Result<Self, ProvisionError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/provision-storage",
                config.control_plane_url.trim_end_matches('/')
            ),
            token_env: config.token_env.clone(),
            auth_scheme: config.auth_scheme.clone(),
            storage_gib: config.storage_gib,
        })
    }

    /// Provisions a volume using the token found in the environment.
    ///
    /// Fails with [`ProvisionError::Authentication`] before any request is
    /// made when the token variable is unset.
    pub async fn provision(&self) -> Result<VolumeHandle, ProvisionError> {
        let token = ExecutionToken::from_env(&self.token_env)
            .ok_or_else(|| ProvisionError::Authentication(self.token_env.clone()))?;
        self.provision_with_token(&token).await
    }

    /// Provisions a volume with an explicit token.
    pub async fn provision_with_token(
        &self,
        token: &ExecutionToken,
    ) -> Result<VolumeHandle, ProvisionError> {
        info!(storage_gib = self.storage_gib, "Provisioning shared storage volume");
        debug!(endpoint = %self.endpoint, "Sending provisioning request");

        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, token.header_value(&self.auth_scheme))
            .json(&ProvisionRequest {
                storage_gib: self.storage_gib,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProvisionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let parsed: ProvisionResponse = serde_json::from_str(&body).map_err(|e| {
            ProvisionError::InvalidResponse(format!("{}, body: {}", e, body))
        })?;
        let name = parsed
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ProvisionError::InvalidResponse("missing volume name".to_string()))?;

        info!(volume = %name, "Shared storage volume provisioned");
        Ok(VolumeHandle::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value() {
        let token = ExecutionToken::new("abc123");
        assert_eq!(
            token.header_value("Latch-Execution-Token"),
            "Latch-Execution-Token abc123"
        );
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = ExecutionToken::new("secret-value");
        assert!(!format!("{:?}", token).contains("secret-value"));
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let var = format!("READSIM_TEST_EMPTY_TOKEN_{}", uuid::Uuid::new_v4().simple());
        std::env::set_var(&var, "");
        assert!(ExecutionToken::from_env(&var).is_none());
        std::env::remove_var(&var);
    }

    #[test]
    fn test_volume_handle_serde_transparent() {
        let handle = VolumeHandle::new("pvc-42");
        assert_eq!(serde_json::to_string(&handle).unwrap(), "\"pvc-42\"");
        assert_eq!(handle.to_string(), "pvc-42");
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let var = format!("READSIM_TEST_MISSING_TOKEN_{}", uuid::Uuid::new_v4().simple());
        // Port 9 (discard) on localhost: any request attempt would surface as Request.
        let config = RuntimeConfig::default()
            .with_control_plane("http://127.0.0.1:9")
            .with_token_env(var.clone());
        let provisioner = Provisioner::new(&config).unwrap();

        match provisioner.provision().await {
            Err(ProvisionError::Authentication(name)) => assert_eq!(name, var),
            other => panic!("expected authentication error, got {:?}", other),
        }
    }
}
