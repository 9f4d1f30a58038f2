// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the streamhub client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    #[arg(long, default_value = "http://localhost:4000", env = "STREAMHUB_API_URL")]
    pub api_url: String,

    /// WebSocket URL of the chat relay.
    #[arg(long, default_value = "ws://localhost:3000/ws", env = "STREAMHUB_CHAT_URL")]
    pub chat_url: String,

    /// Max consecutive failed reconnect attempts before the chat connection
    /// gives up (until the next explicit connect).
    #[arg(long, default_value_t = 5, env = "STREAMHUB_RECONNECT_ATTEMPTS")]
    pub reconnect_attempts: u32,

    /// Initial reconnect delay in milliseconds.
    #[arg(long, default_value_t = 1000, env = "STREAMHUB_RECONNECT_DELAY_MS")]
    pub reconnect_delay_ms: u64,

    /// Reconnect delay ceiling in milliseconds.
    #[arg(long, default_value_t = 5000, env = "STREAMHUB_RECONNECT_DELAY_MAX_MS")]
    pub reconnect_delay_max_ms: u64,

    /// HTTP request timeout in seconds.
    #[arg(long, default_value_t = 10, env = "STREAMHUB_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: u64,

    /// Override the credential state directory. When unset, the store
    /// resolves a platform state directory per call and falls back to
    /// process-local memory when none is available.
    #[arg(long, env = "STREAMHUB_STATE_DIR")]
    pub state_dir: Option<std::path::PathBuf>,
}

impl ClientConfig {
    pub fn reconnect_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn reconnect_delay_max(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reconnect_delay_max_ms)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:4000".to_owned(),
            chat_url: "ws://localhost:3000/ws".to_owned(),
            reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
            reconnect_delay_max_ms: 5000,
            http_timeout_secs: 10,
            state_dir: None,
        }
    }
}
