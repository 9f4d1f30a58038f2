// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication endpoints.

use serde::{Deserialize, Serialize};

use crate::api::client::ApiClient;
use crate::domain::User;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl ApiClient {
    /// `POST /api/users/register`
    pub async fn register(&self, req: &RegisterRequest) -> anyhow::Result<AuthResponse> {
        self.post_json("/api/users/register", req).await
    }

    /// `POST /api/users/login`
    pub async fn login(&self, req: &LoginRequest) -> anyhow::Result<LoginResponse> {
        self.post_json("/api/users/login", req).await
    }

    /// `POST /api/auth/logout` — invalidate a refresh token server-side.
    pub async fn logout(&self, refresh_token: &str) -> anyhow::Result<()> {
        let resp = self
            .send(
                self.http()
                    .post(self.url("/api/auth/logout"))
                    .json(&serde_json::json!({ "refreshToken": refresh_token })),
            )
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("logout failed ({status}): {text}");
        }
        Ok(())
    }

    /// `POST /api/auth/refresh` — exchange a refresh token for a new access
    /// token. See [`ApiClient::refresh_access_token`] for the direct path
    /// the interceptor uses; this is the caller-facing variant.
    pub async fn refresh(&self, refresh_token: &str) -> anyhow::Result<String> {
        self.refresh_access_token(refresh_token).await
    }
}
