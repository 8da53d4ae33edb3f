// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider errors.

use crate::error::ClientError;

/// Identity provider error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Login requested while an identity is already active
    #[error("User is already authenticated")]
    AlreadyAuthenticated,
    /// No credential configured for login
    #[error("No identity token is configured")]
    MissingToken,
    /// Token is malformed
    #[error("Token is malformed")]
    MalformedToken,
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,
    /// Subject claim is not a valid principal
    #[error("Token subject is not a valid principal: {0}")]
    InvalidSubject(String),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::AlreadyAuthenticated => "already_authenticated",
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidSubject(_) => "invalid_subject",
        }
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        ClientError::Identity(err.to_string())
    }
}
