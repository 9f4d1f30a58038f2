// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain types for the backend API and the chat relay.
//!
//! Wire names are camelCase to match the backend JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// A user's channel: the owning user plus their stream metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub user: User,
    pub stream: ChannelStream,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStream {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_live: bool,
    /// Included for the owner's own channel only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_key: Option<String>,
}

impl Channel {
    /// Normalize a channel response into the canonical shape.
    ///
    /// Backend builds have shipped the stream fields both nested under a
    /// `stream` object and flattened onto the channel object itself. Accept
    /// either here so the drift never leaks past the API boundary.
    pub fn from_value(value: serde_json::Value) -> anyhow::Result<Self> {
        let user = value
            .get("user")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("channel response missing user"))?;
        let user: User = serde_json::from_value(user)?;

        let stream_value = match value.get("stream") {
            Some(v) if v.is_object() => v.clone(),
            _ => value,
        };
        let stream: ChannelStream = serde_json::from_value(stream_value)?;

        Ok(Self { user, stream })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vod {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub user_id: String,
    pub stream_id: String,
    pub created_at: String,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: u64,
}

/// A chat message as rendered to the user.
///
/// Inbound messages come off the relay verbatim; presence events are
/// synthesized into this shape client-side with `is_system` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub created_at: String,
    /// Empty for synthesized system messages (presence carries no room id).
    #[serde(default)]
    pub stream_id: String,
    pub user_id: String,
    pub user: MessageUser,
    #[serde(default)]
    pub is_system: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUser {
    pub id: String,
    pub username: String,
}

/// Presence payload carried by `userJoined` / `userLeft` relay events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub user_id: String,
    pub username: String,
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod domain_tests;
