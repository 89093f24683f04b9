//! Client for our own auth API, with durable bearer-token storage.
//!
//! The token is the only thing that survives a restart. `rehydrate` closes
//! the stored-token-but-no-user gap on startup by exchanging the token for
//! the current user via `/api/auth/me`; an invalid or expired token is
//! discarded and the app simply stays logged out.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::api::error::ErrorResponse;
use crate::db::{AuthResponse, LoginRequest, MeResponse, RegisterRequest, UserProfile};

/// Fixed name the token is stored under.
pub const TOKEN_STORAGE_KEY: &str = "token";

#[derive(Debug, Error)]
pub enum AuthClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
}

/// Durable storage for the bearer token.
pub trait TokenStore {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn clear(&self);
}

/// Token persisted as a file under the app's data directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(TOKEN_STORAGE_KEY),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let token = std::fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn save(&self, token: &str) {
        if let Err(e) = std::fs::write(&self.path, token) {
            tracing::error!("Failed to persist token: {}", e);
        }
    }

    fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn save(&self, token: &str) {
        *self.token.lock().unwrap() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.lock().unwrap() = None;
    }
}

pub struct AuthClient<S: TokenStore> {
    http: Client,
    base_url: String,
    store: S,
}

impl<S: TokenStore> AuthClient<S> {
    pub fn new(base_url: impl Into<String>, store: S) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            store,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.store.load()
    }

    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<UserProfile, AuthClientError> {
        let response = self
            .http
            .post(format!("{}/api/auth/register", self.base_url))
            .json(request)
            .send()
            .await?;
        let auth: AuthResponse = parse_response(response).await?;
        self.store.save(&auth.token);
        Ok(auth.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthClientError> {
        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let auth: AuthResponse = parse_response(response).await?;
        self.store.save(&auth.token);
        Ok(auth.user)
    }

    pub fn logout(&self) {
        self.store.clear();
    }

    /// Exchange a stored token for the current user, if any. `Ok(None)`
    /// means no usable token: either none was stored, or the stored one was
    /// rejected and has been cleared.
    pub async fn rehydrate(&self) -> Result<Option<UserProfile>, AuthClientError> {
        let Some(token) = self.store.load() else {
            return Ok(None);
        };

        let response = self
            .http
            .get(format!("{}/api/auth/me", self.base_url))
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Stored token rejected, clearing it");
            self.store.clear();
            return Ok(None);
        }

        let me: MeResponse = parse_response(response).await?;
        Ok(Some(me.user))
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AuthClientError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| "Request failed".to_string());
        return Err(AuthClientError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load(), None);
        store.save("abc.def.ghi");
        assert_eq!(store.load().as_deref(), Some("abc.def.ghi"));
        store.clear();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("jeevo-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let store = FileTokenStore::new(&dir);
        assert_eq!(store.load(), None);
        store.save("abc.def.ghi");
        assert_eq!(store.load().as_deref(), Some("abc.def.ghi"));
        store.clear();
        assert_eq!(store.load(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_rehydrate_without_token_skips_network() {
        // Unroutable base URL: any network attempt would return Err
        let client = AuthClient::new("http://127.0.0.1:1", MemoryTokenStore::new());
        let result = client.rehydrate().await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let client = AuthClient::new("http://127.0.0.1:1", MemoryTokenStore::new());
        client.store.save("abc.def.ghi");
        client.logout();
        assert_eq!(client.token(), None);
    }
}
