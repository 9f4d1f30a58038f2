// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access-token claim decoding.
//!
//! The client never trusts these fields for authorization — the backend
//! verifies the signature on every request. Claims are decoded locally only
//! for display and expiry gating, so no signature check happens here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Claims carried in the access-token payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub email: String,
    /// Expiry as epoch seconds.
    pub exp: u64,
}

impl Claims {
    pub fn is_expired(&self, now_epoch_secs: u64) -> bool {
        self.exp <= now_epoch_secs
    }
}

/// Decode the payload segment of a JWT-style bearer token.
pub fn decode_claims(token: &str) -> anyhow::Result<Claims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("malformed token: missing payload segment"))?;
    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Return current epoch seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod jwt_tests;
