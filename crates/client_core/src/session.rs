use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::domain::Profile;
use storage::Storage;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::GatewayError;

/// Persistence for the single bearer token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, token: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl TokenStore for Storage {
    async fn load(&self) -> Result<Option<String>> {
        self.auth_token().await
    }

    async fn save(&self, token: &str) -> Result<()> {
        self.set_auth_token(token).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_auth_token().await
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.token.lock().await.take();
        Ok(())
    }
}

/// Resolves the profile that belongs to a bearer token.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, GatewayError>;
}

pub struct MissingProfileSource;

#[async_trait]
impl ProfileSource for MissingProfileSource {
    async fn fetch_profile(&self, _token: &str) -> Result<Profile, GatewayError> {
        Err(GatewayError::NotConfigured("profile endpoint"))
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    profile: Option<Profile>,
    inflight_refreshes: usize,
}

/// Single owner of "who is logged in". Constructed once and shared by
/// reference; mutated only through `login`, `logout` and `refresh_profile`.
pub struct SessionStore {
    tokens: Arc<dyn TokenStore>,
    profiles: Arc<dyn ProfileSource>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(tokens: Arc<dyn TokenStore>, profiles: Arc<dyn ProfileSource>) -> Self {
        Self {
            tokens,
            profiles,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Loads the persisted token and, when one exists, resolves its profile.
    pub async fn restore(&self) -> Session {
        let token = match self.tokens.load().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "session: failed to read persisted token");
                None
            }
        };
        let has_token = token.is_some();
        self.state.write().await.token = token;
        debug!(has_token, "session: restored");

        self.refresh_profile().await;
        self.snapshot().await
    }

    /// Applies a successful sign-in immediately; the caller-supplied profile
    /// is trusted and no fetch happens here.
    pub async fn login(&self, token: impl Into<String>, profile: Profile) {
        let token = token.into();
        {
            let mut state = self.state.write().await;
            state.token = Some(token.clone());
            state.profile = Some(profile);
        }
        if let Err(err) = self.tokens.save(&token).await {
            warn!(error = %err, "session: failed to persist token; continuing in memory");
        }
        info!("session: logged in");
    }

    pub async fn logout(&self) {
        {
            let mut state = self.state.write().await;
            state.token = None;
            state.profile = None;
        }
        if let Err(err) = self.tokens.clear().await {
            warn!(error = %err, "session: failed to erase persisted token");
        }
        info!("session: logged out");
    }

    /// Re-fetches the profile for the current token. Failures are logged and
    /// leave the token in place with no profile.
    pub async fn refresh_profile(&self) {
        let token = {
            let mut state = self.state.write().await;
            match state.token.clone() {
                Some(token) => {
                    state.inflight_refreshes += 1;
                    token
                }
                None => {
                    state.profile = None;
                    return;
                }
            }
        };

        let fetched = self.profiles.fetch_profile(&token).await;

        let mut state = self.state.write().await;
        state.inflight_refreshes = state.inflight_refreshes.saturating_sub(1);
        if state.token.as_deref() != Some(token.as_str()) {
            debug!("session: token changed during profile fetch; discarding result");
            return;
        }
        match fetched {
            Ok(profile) => {
                debug!("session: profile refreshed");
                state.profile = Some(profile);
            }
            Err(err) => {
                warn!(error = %err, "session: profile fetch failed");
                state.profile = None;
            }
        }
    }

    pub async fn snapshot(&self) -> Session {
        let state = self.state.read().await;
        Session {
            token: state.token.clone(),
            profile: state.profile.clone(),
            loading: state.inflight_refreshes > 0,
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn profile(&self) -> Option<Profile> {
        self.state.read().await.profile.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.token.is_some()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
