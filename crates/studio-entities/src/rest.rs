//! REST Persistence Gateway
//!
//! Routes, relative to the base URL:
//! - `POST   /{collection}` create
//! - `PATCH  /{collection}/{id}` update (merged patch object)
//! - `POST   /{collection}/{id}/relations/{domain}` link
//! - `DELETE /{collection}/{id}/relations/{domain}` unlink
//! - `DELETE /{collection}/{id}` delete
//! - `PUT    /{collection}/{id}/custom-fields` custom field values

use crate::custom_fields::CustomFieldGateway;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Duration;
use studio_draft::{
    patch_object, ChangeOf, EngineError, EntityId, EntityKind, PersistenceError,
    PersistenceGateway, RelationLink,
};

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Connection settings for [`RestGateway`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    /// API root, e.g. `https://studio.example.com/api`
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            token: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RestConfig {
    /// Create config for a base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// With bearer token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Gateway for one entity kind over HTTP/JSON
pub struct RestGateway<K: EntityKind> {
    config: RestConfig,
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K: EntityKind> std::fmt::Debug for RestGateway<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestGateway")
            .field("collection", &K::COLLECTION)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl<K: EntityKind> RestGateway<K> {
    /// Build gateway and its HTTP client
    ///
    /// # Errors
    /// `EngineError::Config` if the token is not a valid header value or the
    /// client cannot be built
    pub fn new(config: RestConfig) -> Result<Self, EngineError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = &config.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| EngineError::Config(format!("invalid API token: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            _kind: PhantomData,
        })
    }

    /// Connection settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/{}/{}", K::COLLECTION, path.trim_start_matches('/'))
    }

    fn collection(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/{}", K::COLLECTION)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<String, PersistenceError> {
        let response = request
            .send()
            .await
            .map_err(|e| PersistenceError::Network(format!("{what}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PersistenceError::Network(format!("{what}: reading response: {e}")))?;

        if status.is_success() {
            return Ok(body);
        }
        tracing::debug!("[rest] {} answered {}: {}", what, status, body);
        Err(match status {
            StatusCode::NOT_FOUND => PersistenceError::NotFound(what.to_string()),
            _ => PersistenceError::rejected(status.as_u16(), server_message(&body)),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, PersistenceError> {
        let body = self.send(request, what).await?;
        serde_json::from_str(&body)
            .map_err(|e| PersistenceError::InvalidPayload(format!("{what}: {e}")))
    }
}

/// Pull `message` / `error` out of a JSON error body, else use it verbatim
fn server_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl<K: EntityKind> PersistenceGateway<K> for RestGateway<K> {
    async fn create(&self, fields: &K::Fields) -> Result<K::Entity, PersistenceError> {
        let request = self.client.post(self.collection()).json(fields);
        let entity = self.send_json(request, &format!("create {}", K::NAME)).await?;
        tracing::debug!("[rest] created {}", K::NAME);
        Ok(entity)
    }

    async fn update(
        &self,
        id: EntityId,
        patch: &[ChangeOf<K>],
    ) -> Result<K::Entity, PersistenceError> {
        let body = Value::Object(patch_object(patch)?);
        let request = self.client.patch(self.endpoint(&id.to_string())).json(&body);
        self.send_json(request, &format!("update {} {}", K::NAME, id))
            .await
    }

    async fn link_relation(
        &self,
        entity_id: EntityId,
        link: &RelationLink,
    ) -> Result<(), PersistenceError> {
        let url = self.endpoint(&format!("{entity_id}/relations/{}", link.domain_type));
        let request = self.client.post(url).json(&json!({
            "related_id": link.related_id,
            "extra": link.extra,
        }));
        self.send(
            request,
            &format!("link {} {} to {}", K::NAME, entity_id, link.domain_type),
        )
        .await
        .map(drop)
    }

    async fn unlink_relation(
        &self,
        entity_id: EntityId,
        domain_type: &str,
    ) -> Result<(), PersistenceError> {
        let url = self.endpoint(&format!("{entity_id}/relations/{domain_type}"));
        self.send(
            self.client.delete(url),
            &format!("unlink {} {} from {}", K::NAME, entity_id, domain_type),
        )
        .await
        .map(drop)
    }

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError> {
        self.send(
            self.client.delete(self.endpoint(&id.to_string())),
            &format!("delete {} {}", K::NAME, id),
        )
        .await
        .map(drop)
    }
}

#[async_trait]
impl<K: EntityKind> CustomFieldGateway for RestGateway<K> {
    async fn save_values(
        &self,
        entity_id: EntityId,
        values: &BTreeMap<String, Value>,
    ) -> Result<(), PersistenceError> {
        let url = self.endpoint(&format!("{entity_id}/custom-fields"));
        self.send(
            self.client.put(url).json(values),
            &format!("custom fields of {} {}", K::NAME, entity_id),
        )
        .await
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskKind;

    #[test]
    fn endpoints_join_without_double_slashes() {
        let gateway =
            RestGateway::<TaskKind>::new(RestConfig::new("http://localhost:9000/api/")).unwrap();
        assert_eq!(gateway.collection(), "http://localhost:9000/api/tasks");
        assert_eq!(
            gateway.endpoint("42/relations/campaign"),
            "http://localhost:9000/api/tasks/42/relations/campaign"
        );
    }

    #[test]
    fn server_message_prefers_json_field() {
        assert_eq!(server_message(r#"{"message":"title required"}"#), "title required");
        assert_eq!(server_message("plain failure\n"), "plain failure");
    }

    #[test]
    fn invalid_token_is_config_error() {
        let config = RestConfig::new("http://localhost").with_token("bad\ntoken");
        assert!(matches!(
            RestGateway::<TaskKind>::new(config),
            Err(EngineError::Config(_))
        ));
    }
}
