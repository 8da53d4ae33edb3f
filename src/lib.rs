// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clinic Session - session-bound data layer for the clinic scheduling client
//!
//! This crate binds a backend client to the signed-in identity, caches
//! server-derived entities with single-flight reads, keeps the cache
//! consistent after mutations, and gates screens by session phase and role.
//!
//! ## Modules
//!
//! - `auth` - Identity, identity provider and roles
//! - `backend` - Remote clinic API (trait + HTTP transport)
//! - `binding` - Backend client bound to the current identity
//! - `cache` - Entity cache, cache keys and the invalidation table
//! - `session` - Session facade, phase derivation and the screen gate
//! - `notifications` - Manual notification refresh

pub mod auth;
pub mod backend;
pub mod binding;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod session;

#[cfg(test)]
mod test_support;

pub use error::{ClientError, ValidationError};
pub use session::ClinicSession;
