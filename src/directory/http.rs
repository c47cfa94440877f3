//! HTTP implementation of the [`KeyDirectory`] trait.
//!
//! A thin `reqwest` client over the backend REST API. Every request
//! carries the configured bearer token and is bounded by the configured
//! timeout; a timeout is indistinguishable from any other fetch failure.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::config::CoreConfig;
use crate::directory::{EncryptionMode, KeyDirectory, StoredKeyRecord, TrustedDevice};
use crate::error::{Error, Result};

/// `KeyDirectory` backed by the backend REST API
pub struct HttpKeyDirectory {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

impl HttpKeyDirectory {
    /// Build a directory client from the core configuration
    pub fn new(config: &CoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| Error::NetworkFailure(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| Error::NetworkFailure(e.to_string()))?;
        Ok(response)
    }
}

/// Map a non-success status onto the uniform network error
fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(Error::NetworkFailure(format!(
            "Request failed with status {}",
            response.status()
        )))
    }
}

#[async_trait]
impl KeyDirectory for HttpKeyDirectory {
    async fn fetch_public_key(&self, user_id: &str) -> Result<Option<String>> {
        let url = self.url(&format!("/users/{}/public-key", user_id));
        let response = self.send(self.client.get(&url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: PublicKeyResponse = check_status(response)?
            .json()
            .await
            .map_err(|e| Error::NetworkFailure(format!("Invalid public-key response: {}", e)))?;

        Ok(Some(body.public_key))
    }

    async fn fetch_key_record(&self) -> Result<Option<StoredKeyRecord>> {
        let url = self.url("/users/encryption-keys");
        let response = self.send(self.client.get(&url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let record: StoredKeyRecord = check_status(response)?
            .json()
            .await
            .map_err(|e| Error::NetworkFailure(format!("Invalid key-record response: {}", e)))?;

        Ok(Some(record))
    }

    async fn put_key_record(&self, record: &StoredKeyRecord) -> Result<()> {
        let url = self.url("/users/encryption-keys");
        let response = self.send(self.client.put(&url).json(record)).await?;
        check_status(response)?;

        tracing::info!("stored key record replaced");
        Ok(())
    }

    async fn delete_key_record(&self) -> Result<()> {
        let url = self.url("/users/encryption-keys");
        let response = self.send(self.client.delete(&url)).await?;
        check_status(response)?;

        tracing::info!("stored key record deleted");
        Ok(())
    }

    async fn list_trusted_devices(&self) -> Result<Vec<TrustedDevice>> {
        let url = self.url("/auth/trusted-devices");
        let response = self.send(self.client.get(&url)).await?;

        check_status(response)?
            .json()
            .await
            .map_err(|e| Error::NetworkFailure(format!("Invalid device-list response: {}", e)))
    }

    async fn remove_trusted_device(&self, device_id: &str) -> Result<()> {
        let url = self.url(&format!("/auth/trusted-devices/{}", device_id));
        let response = self.send(self.client.delete(&url)).await?;
        check_status(response)?;
        Ok(())
    }

    async fn set_encryption_mode(
        &self,
        conversation_id: &str,
        mode: EncryptionMode,
    ) -> Result<()> {
        let url = self.url(&format!("/conversations/{}/encryption-mode", conversation_id));
        let body = json!({ "encryptionMode": mode });
        let response = self.send(self.client.put(&url).json(&body)).await?;
        check_status(response)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let config = CoreConfig {
            api_base_url: "https://api.parlor.app/".into(),
            ..CoreConfig::default()
        };

        let directory = HttpKeyDirectory::new(&config).unwrap();
        assert_eq!(
            directory.url("/users/encryption-keys"),
            "https://api.parlor.app/users/encryption-keys"
        );
    }

    #[test]
    fn test_mode_body_shape() {
        let body = json!({ "encryptionMode": EncryptionMode::E2ee });
        assert_eq!(body["encryptionMode"], "e2ee");
    }
}
