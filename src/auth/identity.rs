// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller identity and the identity provider capability.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::Deserialize;

use super::error::AuthError;
use crate::models::PrincipalId;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: i64 = 60;

/// The authenticated principal making requests.
///
/// Compared by value: two identities with the same principal and credential
/// are the same identity and share one backend binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    principal: PrincipalId,
    token: Option<String>,
}

impl Identity {
    pub fn new(principal: PrincipalId) -> Self {
        Self {
            principal,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn principal(&self) -> &PrincipalId {
        &self.principal
    }

    /// Bearer credential sent with every remote call, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Build an identity from a bearer JWT without verifying its signature.
    ///
    /// The `sub` claim must be principal text. Expiry is checked with a
    /// 60 second leeway.
    pub fn from_bearer_token(token: &str) -> Result<Self, AuthError> {
        let token_data = jsonwebtoken::dangerous::insecure_decode::<TokenClaims>(token)
            .map_err(|_| AuthError::MalformedToken)?;
        let claims = token_data.claims;

        let now = chrono::Utc::now().timestamp();
        if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY {
            return Err(AuthError::TokenExpired);
        }

        let principal = PrincipalId::parse(&claims.sub)
            .map_err(|_| AuthError::InvalidSubject(claims.sub.clone()))?;

        Ok(Identity::new(principal).with_token(token))
    }
}

/// Minimal claims read from an identity token.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    /// Subject (caller principal)
    sub: String,
    /// Expiration timestamp
    #[serde(default)]
    exp: i64,
}

/// External identity provider.
///
/// `current_identity` is cheap and synchronous; login and logout may involve
/// network round-trips.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    async fn login(&self) -> Result<(), AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;
}

/// Identity provider backed by a pre-issued bearer token.
///
/// `login` decodes the configured token into an [`Identity`]; `logout`
/// forgets it.
pub struct TokenIdentityProvider {
    token: Option<String>,
    current: RwLock<Option<Identity>>,
}

impl TokenIdentityProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            current: RwLock::new(None),
        }
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn login(&self) -> Result<(), AuthError> {
        if self.current_identity().is_some() {
            return Err(AuthError::AlreadyAuthenticated);
        }
        let token = self.token.as_deref().ok_or(AuthError::MissingToken)?;
        let identity = Identity::from_bearer_token(token)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
        Ok(())
    }

    async fn logout(&self) -> Result<(), AuthError> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
