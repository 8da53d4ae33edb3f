// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session phase, derived from identity presence and the `[profile, self]`
//! cache entry. Nothing here is stored; the cache is the only source.

use crate::auth::Role;
use crate::cache::QueryState;
use crate::models::Profile;

/// Coarse session state used for onboarding and screen gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No identity.
    Unauthenticated,
    /// Identity present, profile read not settled yet.
    ProfileLoading,
    /// Profile read settled with no profile: show onboarding.
    NeedsOnboarding,
    /// Profile read failed and no profile was ever loaded.
    ProfileUnavailable,
    /// Identity and profile present.
    Active,
}

/// What the `[profile, self]` entry says about the caller's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileStatus {
    Pending,
    Missing,
    Present(Role),
    Failed,
}

impl ProfileStatus {
    pub fn from_query(state: &QueryState<Option<Profile>>) -> Self {
        match &state.data {
            Some(Some(profile)) => ProfileStatus::Present(profile.role),
            _ if !state.is_fetched || state.is_loading => ProfileStatus::Pending,
            Some(None) => ProfileStatus::Missing,
            None => ProfileStatus::Failed,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            ProfileStatus::Present(role) => Some(*role),
            _ => None,
        }
    }
}

impl SessionPhase {
    /// Pure derivation: same inputs, same phase.
    pub fn derive(identity_present: bool, profile: ProfileStatus) -> Self {
        if !identity_present {
            return SessionPhase::Unauthenticated;
        }
        match profile {
            ProfileStatus::Pending => SessionPhase::ProfileLoading,
            ProfileStatus::Missing => SessionPhase::NeedsOnboarding,
            ProfileStatus::Failed => SessionPhase::ProfileUnavailable,
            ProfileStatus::Present(_) => SessionPhase::Active,
        }
    }

    /// The onboarding form should be presented.
    pub fn needs_onboarding(&self) -> bool {
        *self == SessionPhase::NeedsOnboarding
    }
}
