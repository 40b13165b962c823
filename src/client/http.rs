use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{GuardError, SnapshotSource};
use crate::database::models::Organization;
use crate::permissions::PermissionSnapshot;
use crate::services::{BulkOutcome, BulkRequest};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Thin HTTP client for the panel API, authenticated with a bearer token
#[derive(Debug, Clone)]
pub struct PanelClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl PanelClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, GuardError> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(GuardError::Unauthenticated),
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GuardError> {
        let response = self.authorized(request)?.send().await.map_err(|e| {
            tracing::error!("Panel API request failed: {}", e);
            GuardError::Http(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(GuardError::Unauthenticated);
        }
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
                .to_string();
            return Err(GuardError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| GuardError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    pub async fn whoami(&self) -> Result<Value, GuardError> {
        self.send(self.client.get(self.url("/api/auth/whoami"))).await
    }

    pub async fn organizations(&self) -> Result<Vec<Organization>, GuardError> {
        self.send(self.client.get(self.url("/api/organizations"))).await
    }

    pub async fn bulk(&self, request: &BulkRequest) -> Result<BulkOutcome, GuardError> {
        self.send(self.client.post(self.url("/api/admin/users/bulk")).json(request))
            .await
    }
}

#[async_trait]
impl SnapshotSource for PanelClient {
    async fn fetch_snapshot(&self) -> Result<PermissionSnapshot, GuardError> {
        self.send(self.client.get(self.url("/api/auth/permissions"))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = PanelClient::new("http://localhost:3000/", None);
        assert_eq!(client.url("/api/auth/permissions"), "http://localhost:3000/api/auth/permissions");
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated_without_a_request() {
        // Nothing listens here; the call must fail before any network I/O
        let client = PanelClient::new("http://127.0.0.1:9", None);
        assert!(matches!(client.fetch_snapshot().await, Err(GuardError::Unauthenticated)));
    }
}
