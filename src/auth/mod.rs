// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Module
//!
//! Minimal view of the external identity provider: the current identity (or
//! its absence) plus login and logout.
//!
//! ## Identity Flow
//!
//! 1. The provider authenticates the user and hands out a bearer JWT
//! 2. The `sub` claim is the caller's principal
//! 3. The session layer reads `current_identity()`; any change of value
//!    clears the entity cache and rebinds the backend client
//!
//! Token signatures are verified by the remote API, not here.

pub mod error;
pub mod identity;
pub mod roles;

pub use error::AuthError;
pub use identity::{Identity, IdentityProvider, TokenIdentityProvider};
pub use roles::Role;
