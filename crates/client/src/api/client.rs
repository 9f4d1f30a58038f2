// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client wrapper with bearer attachment and the single-retry-on-401
//! refresh flow.

use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::store::TokenStore;
use crate::config::ClientConfig;
use crate::error::ErrorResponse;

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    store: Arc<TokenStore>,
    /// Default Authorization header value (`Bearer <token>`). Process-wide,
    /// last-write-wins: every credential transition overwrites it.
    auth_header: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, store: Arc<TokenStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_default();
        Self {
            base_url: config.api_url.trim_end_matches('/').to_owned(),
            http,
            store,
            auth_header: RwLock::new(None),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Install the default Authorization header for subsequent requests.
    pub fn set_auth(&self, token: &str) {
        let mut guard =
            self.auth_header.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(format!("Bearer {token}"));
    }

    pub fn clear_auth(&self) {
        let mut guard =
            self.auth_header.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = None;
    }

    fn auth_header(&self) -> Option<String> {
        self.auth_header
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_header() {
            Some(header) => req.header(reqwest::header::AUTHORIZATION, header),
            None => req,
        }
    }

    /// Send a request with the default Authorization header attached.
    ///
    /// On a 401: if the request body is replayable and a refresh token is
    /// stored, refresh the access token once and replay the original request
    /// with the new credential. Any refresh failure surfaces the original
    /// 401 — never a second refresh for the same logical request, and never
    /// a proactive refresh before expiry.
    pub(crate) async fn send(
        &self,
        req: reqwest::RequestBuilder,
    ) -> anyhow::Result<reqwest::Response> {
        let retry = req.try_clone();
        let resp = self.apply_auth(req).send().await?;
        if resp.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        // Streaming bodies (multipart upload) cannot be replayed.
        let Some(retry) = retry else { return Ok(resp) };
        let Some(refresh_token) = self.store.get_refresh() else { return Ok(resp) };

        let token = match self.refresh_access_token(&refresh_token).await {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(err = %e, "token refresh failed, surfacing original 401");
                return Ok(resp);
            }
        };
        self.store.set(&token);
        self.set_auth(&token);
        tracing::debug!("access token refreshed, replaying request once");
        Ok(self.apply_auth(retry).send().await?)
    }

    /// `POST /api/auth/refresh` — exchanged directly, bypassing the
    /// interceptor so a failing refresh can never recurse into itself.
    pub(crate) async fn refresh_access_token(&self, refresh_token: &str) -> anyhow::Result<String> {
        #[derive(Deserialize)]
        struct RefreshResponse {
            token: String,
        }

        let resp = self
            .http
            .post(self.url("/api/auth/refresh"))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("refresh failed ({status}): {text}");
        }
        Ok(resp.json::<RefreshResponse>().await?.token)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let resp = self.send(self.http.get(self.url(path))).await?;
        into_json(resp).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> anyhow::Result<T> {
        let resp = self.send(self.http.post(self.url(path)).json(body)).await?;
        into_json(resp).await
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Decode a response body, turning non-2xx statuses into errors carrying the
/// backend's message when one is present.
pub(crate) async fn into_json<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> anyhow::Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        anyhow::bail!("request failed ({status}): {message}");
    }
    Ok(resp.json().await?)
}
