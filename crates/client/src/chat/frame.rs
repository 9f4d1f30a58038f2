// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay wire frames: JSON text messages of the shape
//! `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, Presence};

/// Client → relay frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientFrame {
    /// First frame after the socket opens: the session credential.
    Auth(AuthPayload),
    JoinRoom(String),
    LeaveRoom(String),
    SendMessage(OutgoingMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    /// `Bearer <token>`.
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub stream_id: String,
    pub user_id: String,
    pub text: String,
}

/// Relay → client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerFrame {
    NewMessage(ChatMessage),
    UserJoined(Presence),
    UserLeft(Presence),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod frame_tests;
