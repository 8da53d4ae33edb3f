// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the session layer.
//!
//! - [`ClientError::BindingUnavailable`] is a gating condition, not a failure:
//!   reads absorb it as a disabled read, mutations surface it to the caller.
//! - [`ClientError::RemoteCall`] is stored on cache entries for reads and
//!   returned to the caller for mutations (nothing is invalidated).
//! - [`ClientError::Validation`] is raised before any call is made and never
//!   reaches the cache.

use thiserror::Error;

/// Errors surfaced by the session layer.
///
/// `Clone` because a single failed fetch is shared by every waiter on the
/// same key and also kept on the cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("No backend client is bound for the current identity")]
    BindingUnavailable,

    #[error("Remote call `{operation}` failed: {message}")]
    RemoteCall {
        operation: &'static str,
        message: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Identity provider error: {0}")]
    Identity(String),
}

impl ClientError {
    pub fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        Self::RemoteCall {
            operation,
            message: message.into(),
        }
    }

    /// Whether the UI should show a notice for this error.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ClientError::BindingUnavailable)
    }

    /// Short code for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::BindingUnavailable => "binding_unavailable",
            ClientError::RemoteCall { .. } => "remote_call_failure",
            ClientError::Validation(_) => "validation_failure",
            ClientError::Identity(_) => "identity_error",
        }
    }
}

/// Client-side input rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter {0}")]
    EmptyField(&'static str),

    #[error("Age {0} is out of range (expected 1-150)")]
    AgeOutOfRange(u64),

    #[error("Malformed principal ID: {0}")]
    MalformedPrincipal(String),

    #[error("Please select {0}")]
    MissingSelection(&'static str),
}
