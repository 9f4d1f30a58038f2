// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streamhub client SDK: authenticated REST access and room chat for the
//! streaming platform backend.
//!
//! The [`Client`] service object owns the token store, the HTTP client, the
//! chat client, and the session manager for one logical user session. The
//! session manager owns the credential; the HTTP and chat clients consume
//! it read-only and are kept in step on every credential transition.

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod domain;
pub mod error;

use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::{SessionManager, TokenStore};
use crate::chat::ChatClient;
use crate::config::ClientConfig;

/// One logical user session, with explicit lifecycle instead of ambient
/// globals: construct, `session.init()`, use, `teardown`.
pub struct Client {
    pub store: Arc<TokenStore>,
    pub api: Arc<ApiClient>,
    pub chat: Arc<ChatClient>,
    pub session: SessionManager,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let store = Arc::new(TokenStore::new(config.state_dir.clone()));
        let api = Arc::new(ApiClient::new(&config, Arc::clone(&store)));
        let chat = Arc::new(ChatClient::new(&config));
        let session = SessionManager::new(Arc::clone(&store), Arc::clone(&api), Arc::clone(&chat));
        Self { store, api, chat, session }
    }

    /// Tear down the live chat connection and its listeners. Stored
    /// credentials stay intact; use [`SessionManager::logout`] to clear
    /// them.
    pub fn teardown(&self) {
        self.chat.disconnect();
    }
}
