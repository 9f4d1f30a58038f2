// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time chat over a single long-lived relay connection.

pub mod client;
pub mod frame;

pub use client::{ChatClient, ChatError, ConnectionNotice, ConnectionState};
pub use frame::OutgoingMessage;
