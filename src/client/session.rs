use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::store::KeyValueStore;
use super::ClientResult;
use crate::db::models::PublicUser;

pub const AUTH_KEY: &str = "@knowledgehub_auth";
pub const ONBOARDING_KEY: &str = "@nexio_onboarding_complete";

/// The persisted login: the user record and, when the server issued one,
/// the session token. Never holds a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAuth {
    #[serde(flatten)]
    pub user: PublicUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// An unreadable record counts as logged out.
    pub async fn load(&self) -> ClientResult<Option<StoredAuth>> {
        let Some(raw) = self.store.get(AUTH_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(auth) => Ok(Some(auth)),
            Err(e) => {
                tracing::warn!("Discarding unreadable stored auth: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, auth: &StoredAuth) -> ClientResult<()> {
        self.store
            .set(AUTH_KEY, &serde_json::to_string(auth)?)
            .await
    }

    /// Replace the stored user, keeping the token.
    pub async fn update_user(&self, user: PublicUser) -> ClientResult<()> {
        let token = self.load().await?.and_then(|auth| auth.token);
        self.save(&StoredAuth { user, token }).await
    }

    pub async fn clear(&self) -> ClientResult<()> {
        self.store.remove(AUTH_KEY).await
    }

    pub async fn onboarding_complete(&self) -> ClientResult<bool> {
        Ok(self.store.get(ONBOARDING_KEY).await?.as_deref() == Some("true"))
    }

    pub async fn complete_onboarding(&self) -> ClientResult<()> {
        self.store.set(ONBOARDING_KEY, "true").await
    }
}
