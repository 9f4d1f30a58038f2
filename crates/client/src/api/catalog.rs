// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream, channel, and VOD endpoints.

use std::path::Path;

use crate::api::client::{into_json, ApiClient};
use crate::domain::{Channel, Stream, Vod};

impl ApiClient {
    /// `GET /api/streams`
    pub async fn streams(&self) -> anyhow::Result<Vec<Stream>> {
        self.get_json("/api/streams").await
    }

    /// `GET /api/users/{id}/channel`
    pub async fn channel(&self, user_id: &str) -> anyhow::Result<Channel> {
        let value: serde_json::Value =
            self.get_json(&format!("/api/users/{user_id}/channel")).await?;
        Channel::from_value(value)
    }

    /// `GET /api/users/me/channel`
    pub async fn my_channel(&self) -> anyhow::Result<Channel> {
        let value: serde_json::Value = self.get_json("/api/users/me/channel").await?;
        Channel::from_value(value)
    }

    /// `GET /api/vods/{id}`
    pub async fn vod(&self, id: &str) -> anyhow::Result<Vod> {
        self.get_json(&format!("/api/vods/{id}")).await
    }

    /// `GET /api/vods/channel/{id}`
    pub async fn channel_vods(&self, channel_id: &str) -> anyhow::Result<Vec<Vod>> {
        self.get_json(&format!("/api/vods/channel/{channel_id}")).await
    }

    /// `POST /api/vods/upload` — multipart video upload.
    ///
    /// The multipart body is not replayable, so this is the one request kind
    /// that skips the 401 retry (the interceptor detects that itself).
    pub async fn upload_vod(
        &self,
        title: &str,
        description: &str,
        file: &Path,
    ) -> anyhow::Result<Vod> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_owned());
        let form = reqwest::multipart::Form::new()
            .text("title", title.to_owned())
            .text("description", description.to_owned())
            .part("video", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let resp = self
            .send(self.http().post(self.url("/api/vods/upload")).multipart(form))
            .await?;
        into_json(resp).await
    }
}
