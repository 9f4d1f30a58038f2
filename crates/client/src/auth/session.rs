// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: owns the credential, derives the identity, and keeps
//! the HTTP default header and the chat credential in step with it.

use std::sync::{Arc, RwLock};

use crate::api::ApiClient;
use crate::auth::jwt::{decode_claims, epoch_secs, Claims};
use crate::auth::store::TokenStore;
use crate::chat::ChatClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Anonymous,
    Authenticated,
}

/// User-identifying fields decoded from the access-token claims. Present
/// iff a non-expired credential is present; recomputed on every credential
/// change, never independently persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Expiry as epoch seconds.
    pub expires_at: u64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            email: claims.email,
            expires_at: claims.exp,
        }
    }
}

pub struct SessionManager {
    store: Arc<TokenStore>,
    api: Arc<ApiClient>,
    chat: Arc<ChatClient>,
    state: RwLock<SessionState>,
    identity: RwLock<Option<Identity>>,
    /// Held across a refresh round-trip; `try_lock` makes concurrent
    /// refreshes a no-op instead of racing each other's refresh token.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(store: Arc<TokenStore>, api: Arc<ApiClient>, chat: Arc<ChatClient>) -> Self {
        Self {
            store,
            api,
            chat,
            state: RwLock::new(SessionState::Uninitialized),
            identity: RwLock::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.identity.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Read the stored credential and settle to Anonymous or Authenticated.
    /// An expired or undecodable stored credential is cleared.
    pub fn init(&self) {
        self.set_state(SessionState::Loading);

        let Some(token) = self.store.get() else {
            self.settle_anonymous();
            return;
        };

        match decode_claims(&token) {
            Ok(claims) if !claims.is_expired(epoch_secs()) => {
                self.api.set_auth(&token);
                self.set_identity(Some(claims.into()));
                self.set_state(SessionState::Authenticated);
            }
            Ok(_) => {
                tracing::debug!("stored access token expired, clearing credential");
                self.clear_credential();
                self.settle_anonymous();
            }
            Err(e) => {
                tracing::warn!(err = %e, "stored access token undecodable, clearing credential");
                self.clear_credential();
                self.settle_anonymous();
            }
        }
    }

    /// Adopt a freshly issued credential pair (login or registration).
    ///
    /// A token that fails to decode is a failed login: the credential is
    /// cleared and the session reverts to Anonymous.
    pub fn login(&self, token: &str, refresh_token: Option<&str>) -> anyhow::Result<()> {
        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                self.clear_credential();
                self.api.clear_auth();
                self.settle_anonymous();
                return Err(e.context("login token undecodable"));
            }
        };

        self.store.set(token);
        if let Some(refresh) = refresh_token {
            self.store.set_refresh(refresh);
        }
        self.set_identity(Some(claims.into()));
        self.set_state(SessionState::Authenticated);
        self.api.set_auth(token);
        self.chat.update_token(token);
        Ok(())
    }

    /// End the session. Server-side invalidation is best-effort: a failure
    /// is logged, never surfaced — local teardown always completes.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.get_refresh() {
            if let Err(e) = self.api.logout(&refresh_token).await {
                tracing::warn!(err = %e, "server-side logout failed, clearing local session anyway");
            }
        }
        self.clear_credential();
        self.api.clear_auth();
        self.settle_anonymous();
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Single-flight: a call while another refresh is in flight is a no-op.
    /// A failed refresh tears the whole session down via `logout`.
    pub async fn refresh(&self) -> anyhow::Result<()> {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            return Ok(());
        };

        match self.try_refresh().await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(err = %e, "token refresh failed, logging out");
                self.logout().await;
                Err(e)
            }
        }
    }

    async fn try_refresh(&self) -> anyhow::Result<()> {
        let refresh_token = self
            .store
            .get_refresh()
            .ok_or_else(|| anyhow::anyhow!("no refresh token stored"))?;
        let token = self.api.refresh_access_token(&refresh_token).await?;
        let claims = decode_claims(&token)?;

        self.store.set(&token);
        self.set_identity(Some(claims.into()));
        self.set_state(SessionState::Authenticated);
        self.api.set_auth(&token);
        self.chat.update_token(&token);
        Ok(())
    }

    fn settle_anonymous(&self) {
        self.set_identity(None);
        self.set_state(SessionState::Anonymous);
    }

    fn clear_credential(&self) {
        self.store.clear();
        self.store.clear_refresh();
    }

    fn set_state(&self, state: SessionState) {
        let mut guard = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = state;
    }

    fn set_identity(&self, identity: Option<Identity>) {
        let mut guard =
            self.identity.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = identity;
    }
}
