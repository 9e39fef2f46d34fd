//! Credential store implementations.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use dashmap::DashMap;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::upstream::{Upstream, UpstreamClient};
use crate::model::{PermissionRecord, UserRecord};

#[derive(Debug, Error)]
pub enum AuthStoreError {
    #[error("auth store request failed: {0}")]
    Transport(String),

    #[error("auth store returned status {0}")]
    Status(StatusCode),

    #[error("auth store returned a malformed document: {0}")]
    Malformed(String),
}

/// Lookup interface the authenticator resolves callers through.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AuthStoreError>;

    async fn find_permission(
        &self,
        username: &str,
    ) -> Result<Option<PermissionRecord>, AuthStoreError>;
}

/// Credentials stored as documents on the upstream cluster, one index for
/// users and one for permissions, keyed by username.
pub struct ClusterCredentialStore {
    client: UpstreamClient,
    upstream: Upstream,
    users_index: String,
    permissions_index: String,
}

impl ClusterCredentialStore {
    pub fn new(
        client: UpstreamClient,
        upstream: Upstream,
        users_index: String,
        permissions_index: String,
    ) -> ClusterCredentialStore {
        ClusterCredentialStore {
            client,
            upstream,
            users_index,
            permissions_index,
        }
    }

    async fn fetch_doc<T: DeserializeOwned>(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<T>, AuthStoreError> {
        let path = format!("/{}/_doc/{}", index, urlencoding::encode(id));
        let uri = self
            .upstream
            .uri(&path)
            .map_err(|e| AuthStoreError::Transport(e.to_string()))?;

        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| AuthStoreError::Transport(e.to_string()))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| AuthStoreError::Transport(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AuthStoreError::Status(resp.status()));
        }

        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| AuthStoreError::Transport(e.to_string()))?
            .to_bytes();

        #[derive(serde::Deserialize)]
        struct GetDocResponse<T> {
            #[serde(default)]
            found: bool,
            #[serde(rename = "_source")]
            source: Option<T>,
        }

        let doc: GetDocResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|e| AuthStoreError::Malformed(e.to_string()))?;
        if !doc.found {
            return Ok(None);
        }
        doc.source
            .map(Some)
            .ok_or_else(|| AuthStoreError::Malformed("document without _source".into()))
    }
}

#[async_trait]
impl CredentialStore for ClusterCredentialStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AuthStoreError> {
        self.fetch_doc(&self.users_index, username).await
    }

    async fn find_permission(
        &self,
        username: &str,
    ) -> Result<Option<PermissionRecord>, AuthStoreError> {
        self.fetch_doc(&self.permissions_index, username).await
    }
}

/// In-memory store seeded from configuration. Used when credentials are
/// declared inline and by the integration tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, UserRecord>,
    permissions: DashMap<String, PermissionRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> MemoryCredentialStore {
        MemoryCredentialStore::default()
    }

    pub fn seed(users: Vec<UserRecord>, permissions: Vec<PermissionRecord>) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        for user in users {
            store.users.insert(user.username.clone(), user);
        }
        for permission in permissions {
            store.permissions.insert(permission.username.clone(), permission);
        }
        store
    }

    pub fn insert_user(&self, user: UserRecord) {
        self.users.insert(user.username.clone(), user);
    }

    pub fn insert_permission(&self, permission: PermissionRecord) {
        self.permissions.insert(permission.username.clone(), permission);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AuthStoreError> {
        Ok(self.users.get(username).map(|r| r.value().clone()))
    }

    async fn find_permission(
        &self,
        username: &str,
    ) -> Result<Option<PermissionRecord>, AuthStoreError> {
        Ok(self.permissions.get(username).map(|r| r.value().clone()))
    }
}
