// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token persistence: access/refresh pair in a JSON state file with atomic
//! writes, falling back to process-local memory when no state directory is
//! available.
//!
//! The medium is picked per call, not at construction: a process that gains
//! or loses its state directory mid-run keeps working. The store never
//! errors — absent values read as `None` and filesystem failures degrade to
//! the in-memory copy.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

const TOKENS_FILE: &str = "tokens.json";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

enum Medium {
    /// Resolve a state directory from the environment on every call.
    Auto,
    /// Fixed directory (config override, tests).
    Dir(PathBuf),
    /// Never touch the filesystem.
    Memory,
}

pub struct TokenStore {
    medium: Medium,
    memory: Mutex<StoredTokens>,
}

impl TokenStore {
    /// Store backed by `state_dir` when given, otherwise by per-call
    /// environment resolution with a memory fallback.
    pub fn new(state_dir: Option<PathBuf>) -> Self {
        let medium = match state_dir {
            Some(dir) => Medium::Dir(dir),
            None => Medium::Auto,
        };
        Self { medium, memory: Mutex::new(StoredTokens::default()) }
    }

    /// Store that only ever uses process-local memory.
    pub fn ephemeral() -> Self {
        Self { medium: Medium::Memory, memory: Mutex::new(StoredTokens::default()) }
    }

    pub fn get(&self) -> Option<String> {
        self.read(|t| t.access_token.clone())
    }

    pub fn set(&self, token: &str) {
        self.update(|t| t.access_token = Some(token.to_owned()));
    }

    pub fn clear(&self) {
        self.update(|t| t.access_token = None);
    }

    pub fn get_refresh(&self) -> Option<String> {
        self.read(|t| t.refresh_token.clone())
    }

    pub fn set_refresh(&self, token: &str) {
        self.update(|t| t.refresh_token = Some(token.to_owned()));
    }

    pub fn clear_refresh(&self) {
        self.update(|t| t.refresh_token = None);
    }

    fn resolve_dir(&self) -> Option<PathBuf> {
        match &self.medium {
            Medium::Dir(dir) => Some(dir.clone()),
            Medium::Memory => None,
            Medium::Auto => default_state_dir(),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&StoredTokens) -> R) -> R {
        if let Some(dir) = self.resolve_dir() {
            let tokens = load_file(&dir).unwrap_or_default();
            return f(&tokens);
        }
        let guard = self.memory.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }

    /// Apply a mutation to the memory copy and, when a directory resolves,
    /// mirror it to disk. Writes to both media the way the original client
    /// wrote both storage and its memory fallback.
    fn update(&self, f: impl FnOnce(&mut StoredTokens)) {
        let snapshot = {
            let mut guard =
                self.memory.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(dir) = self.resolve_dir() {
                // Disk is the durable copy; pick up writes from other
                // processes before mutating.
                if let Some(on_disk) = load_file(&dir) {
                    *guard = on_disk;
                }
            }
            f(&mut guard);
            guard.clone()
        };
        if let Some(dir) = self.resolve_dir() {
            store_file(&dir, &snapshot);
        }
    }
}

fn load_file(dir: &std::path::Path) -> Option<StoredTokens> {
    let contents = std::fs::read_to_string(dir.join(TOKENS_FILE)).ok()?;
    match serde_json::from_str(&contents) {
        Ok(tokens) => Some(tokens),
        Err(e) => {
            tracing::debug!(err = %e, "token state file unreadable, ignoring");
            None
        }
    }
}

/// Save tokens atomically (write tmp + rename).
///
/// Uses a unique temp filename (PID + counter) to avoid corruption when
/// concurrent saves race on the same `.tmp` file.
fn store_file(dir: &std::path::Path, tokens: &StoredTokens) {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let result = (|| -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(tokens).unwrap_or_default();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = dir.join(format!("{}.{}.{}.tmp", TOKENS_FILE, std::process::id(), seq));
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, dir.join(TOKENS_FILE))?;
        Ok(())
    })();

    if let Err(e) = result {
        tracing::debug!(err = %e, "token state write failed, keeping memory copy");
    }
}

/// Resolve the state directory for token data.
///
/// Checks `STREAMHUB_STATE_DIR`, then `$XDG_STATE_HOME/streamhub`, then
/// `$HOME/.local/state/streamhub`. Returns `None` when no candidate exists,
/// which drops the store down to its memory medium.
fn default_state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("STREAMHUB_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("streamhub"));
    }
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".local/state/streamhub"));
    }
    None
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
