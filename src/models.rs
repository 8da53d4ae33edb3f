// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Remote Data Models
//!
//! Records exchanged with the remote clinic API. Field names are camelCase on
//! the wire. Timestamps are nanoseconds since the Unix epoch.
//!
//! ## Model Categories
//!
//! - **Identity**: [`PrincipalId`] and the caller's [`Profile`]
//! - **Directories**: [`Doctor`], [`Nurse`], [`Patient`]
//! - **Scheduling**: [`Appointment`] and [`AppointmentStatus`]
//! - **Inbox**: [`Notification`]
//! - **Aggregates**: [`DashboardStats`], [`AppointmentStats`]

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::error::ValidationError;

// =============================================================================
// Principal Type
// =============================================================================

/// Textual principal identifying a caller or a directory entry.
///
/// Format: lowercase base32 groups of five characters separated by `-`, the
/// last group possibly shorter (e.g. `2vxsx-fae`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct PrincipalId(String);

/// Longest textual principal (29 bytes + CRC, base32, grouped).
const MAX_PRINCIPAL_TEXT_LEN: usize = 63;

impl PrincipalId {
    /// Parse and validate principal text typed by a user.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let normalized = text.trim().to_lowercase();
        let malformed = || ValidationError::MalformedPrincipal(text.trim().to_string());

        if normalized.is_empty() || normalized.len() > MAX_PRINCIPAL_TEXT_LEN {
            return Err(malformed());
        }

        let groups: Vec<&str> = normalized.split('-').collect();
        let last = groups.len() - 1;
        for (i, group) in groups.iter().enumerate() {
            let valid_len = if i == last {
                (1..=5).contains(&group.len())
            } else {
                group.len() == 5
            };
            let valid_chars = group
                .chars()
                .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c));
            if !valid_len || !valid_chars {
                return Err(malformed());
            }
        }

        Ok(PrincipalId(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PrincipalId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrincipalId::parse(s)
    }
}

// =============================================================================
// Time
// =============================================================================

/// Nanoseconds since the Unix epoch, as stored by the remote API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.timestamp_nanos_opt().unwrap_or(i64::MAX))
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.0)
    }
}

// =============================================================================
// Profile & Directories
// =============================================================================

/// Server-held profile of the calling user.
///
/// Absence of a profile for the current identity means the user still needs
/// onboarding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(rename = "appRole")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doctor {
    pub id: PrincipalId,
    pub name: String,
    pub specialty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nurse {
    pub id: PrincipalId,
    pub name: String,
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: PrincipalId,
    pub name: String,
    pub age: u64,
}

impl Doctor {
    /// Build a doctor record from admin form input.
    pub fn from_form(principal: &str, name: &str, specialty: &str) -> Result<Self, ValidationError> {
        let id = PrincipalId::parse(principal)?;
        Ok(Self {
            id,
            name: non_empty(name, "a name")?,
            specialty: non_empty(specialty, "a specialty")?,
        })
    }
}

impl Nurse {
    /// Build a nurse record from admin form input.
    pub fn from_form(principal: &str, name: &str, department: &str) -> Result<Self, ValidationError> {
        let id = PrincipalId::parse(principal)?;
        Ok(Self {
            id,
            name: non_empty(name, "a name")?,
            department: non_empty(department, "a department")?,
        })
    }
}

fn non_empty(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

// =============================================================================
// Appointments
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: u64,
    pub status: AppointmentStatus,
    pub doctor_id: PrincipalId,
    pub patient_id: PrincipalId,
    pub notes: String,
    pub date_time: Timestamp,
}

impl Appointment {
    /// Scheduled and strictly in the future.
    pub fn is_upcoming(&self, now: Timestamp) -> bool {
        self.status == AppointmentStatus::Scheduled && self.date_time > now
    }
}

/// Split appointments into upcoming (soonest first) and past (latest first).
pub fn partition_appointments(
    appointments: &[Appointment],
    now: Timestamp,
) -> (Vec<Appointment>, Vec<Appointment>) {
    let (mut upcoming, mut past): (Vec<_>, Vec<_>) = appointments
        .iter()
        .cloned()
        .partition(|apt| apt.is_upcoming(now));
    upcoming.sort_by_key(|apt| apt.date_time);
    past.sort_by(|a, b| b.date_time.cmp(&a.date_time));
    (upcoming, past)
}

/// Keep appointments with the given status, or all of them for `None`.
pub fn filter_by_status(
    appointments: &[Appointment],
    status: Option<AppointmentStatus>,
) -> Vec<Appointment> {
    appointments
        .iter()
        .filter(|apt| status.is_none_or(|s| apt.status == s))
        .cloned()
        .collect()
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub user_id: PrincipalId,
    pub seen: bool,
    pub message: String,
    pub timestamp: Timestamp,
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.seen).count()
}

// =============================================================================
// Aggregates
// =============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: u64,
    pub total_doctors: u64,
    pub total_nurses: u64,
    pub total_appointments: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentStats {
    pub total: u64,
    pub scheduled: u64,
    pub completed: u64,
    pub cancelled: u64,
}
