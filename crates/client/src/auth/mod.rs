// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential storage, access-token claim decoding, and the session
//! lifecycle that coordinates both with the HTTP and chat clients.

pub mod jwt;
pub mod session;
pub mod store;

pub use jwt::Claims;
pub use session::{Identity, SessionManager, SessionState};
pub use store::TokenStore;
