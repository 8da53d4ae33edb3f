// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application roles carried on a user profile.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Application role of a registered user.
///
/// Closed set; screen access is decided by exact membership in a screen's
/// allowed role set (see [`crate::session::guard`]). There is no hierarchy:
/// an admin is not implicitly a doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Books and manages their own appointments
    Patient,
    /// Sees their schedule and updates appointment status
    Doctor,
    /// Manages staff, patients, roles and demo data
    Admin,
    /// Clinical staff record, no dedicated screens
    Nurse,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Patient, Role::Doctor, Role::Admin, Role::Nurse];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
            Role::Nurse => "nurse",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Parse role from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            "nurse" => Ok(Role::Nurse),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);
