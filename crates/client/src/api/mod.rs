// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed REST surface over the backend API.

pub mod auth;
pub mod catalog;
pub mod client;

pub use auth::{AuthResponse, LoginRequest, LoginResponse, RegisterRequest};
pub use client::ApiClient;
