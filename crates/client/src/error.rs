// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for the client SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientError {
    Unauthorized,
    /// Room/send operation issued before the first successful `connect`.
    NotInitialized,
    BadRequest,
    NotFound,
    Upstream,
    Internal,
}

impl ClientError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Upstream => "UPSTREAM_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ClientError {}

/// Top-level error response envelope returned by the backend API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Whether a relay error message points at a credential problem rather than
/// a room-level failure. Used to escalate in-room errors into a
/// connection-health notice advising a token refresh.
pub fn is_auth_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("auth") || lower.contains("token") || lower.contains("unauthorized")
}
