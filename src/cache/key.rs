// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structured cache keys and hierarchical key patterns.
//!
//! A key is `[kind, ...discriminators]`. A pattern matches every key of the
//! same kind whose discriminators start with the pattern's discriminators, so
//! `[appointments]` covers `[appointments, patient, p1]` and
//! `[appointments, doctor, d1]` alike.

use std::fmt;

/// Entity kind of a cached read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    Profile,
    Doctors,
    Doctor,
    Nurses,
    Nurse,
    Patients,
    Patient,
    Appointments,
    Appointment,
    Notifications,
    DashboardStats,
    AppointmentStats,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Profile => "profile",
            QueryKind::Doctors => "doctors",
            QueryKind::Doctor => "doctor",
            QueryKind::Nurses => "nurses",
            QueryKind::Nurse => "nurse",
            QueryKind::Patients => "patients",
            QueryKind::Patient => "patient",
            QueryKind::Appointments => "appointments",
            QueryKind::Appointment => "appointment",
            QueryKind::Notifications => "notifications",
            QueryKind::DashboardStats => "dashboardStats",
            QueryKind::AppointmentStats => "appointmentStats",
        }
    }
}

/// Discriminator naming the caller's own record (`[profile, self]`).
pub const SELF_DISCRIMINATOR: &str = "self";

/// Identity of one cacheable result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: QueryKind,
    discriminators: Vec<String>,
}

impl CacheKey {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            discriminators: Vec::new(),
        }
    }

    /// Append a discriminator.
    pub fn with(mut self, discriminator: impl ToString) -> Self {
        self.discriminators.push(discriminator.to_string());
        self
    }

    /// `[profile, self]`
    pub fn own_profile() -> Self {
        Self::new(QueryKind::Profile).with(SELF_DISCRIMINATOR)
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn discriminators(&self) -> &[String] {
        &self.discriminators
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.kind.as_str())?;
        for d in &self.discriminators {
            write!(f, ", {d}")?;
        }
        f.write_str("]")
    }
}

/// Prefix over cache keys used by invalidation and refetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    kind: QueryKind,
    prefix: Vec<String>,
}

impl KeyPattern {
    /// Every entry of `kind`, whatever its discriminators.
    pub fn kind(kind: QueryKind) -> Self {
        Self {
            kind,
            prefix: Vec::new(),
        }
    }

    /// Narrow the pattern by one more leading discriminator.
    pub fn with(mut self, discriminator: impl ToString) -> Self {
        self.prefix.push(discriminator.to_string());
        self
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        self.kind == key.kind && key.discriminators.starts_with(&self.prefix)
    }
}

impl From<&CacheKey> for KeyPattern {
    /// Pattern matching exactly this key and its descendants.
    fn from(key: &CacheKey) -> Self {
        Self {
            kind: key.kind,
            prefix: key.discriminators.clone(),
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.kind.as_str())?;
        for d in &self.prefix {
            write!(f, ", {d}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_pattern_matches_all_discriminators() {
        let pattern = KeyPattern::kind(QueryKind::Appointments);
        assert!(pattern.matches(&CacheKey::new(QueryKind::Appointments)));
        assert!(pattern.matches(&CacheKey::new(QueryKind::Appointments).with("patient").with("p1")));
        assert!(pattern.matches(&CacheKey::new(QueryKind::Appointments).with("doctor").with("d1")));
        assert!(!pattern.matches(&CacheKey::new(QueryKind::Appointment).with(7)));
    }

    #[test]
    fn prefixed_pattern_requires_shared_leading_discriminator() {
        let pattern = KeyPattern::kind(QueryKind::Appointments).with("patient");
        assert!(pattern.matches(&CacheKey::new(QueryKind::Appointments).with("patient").with("p1")));
        assert!(!pattern.matches(&CacheKey::new(QueryKind::Appointments).with("doctor").with("d1")));
        assert!(!pattern.matches(&CacheKey::new(QueryKind::Appointments)));
    }

    #[test]
    fn exact_pattern_from_key() {
        let key = CacheKey::new(QueryKind::Appointment).with(7);
        let pattern = KeyPattern::from(&key);
        assert!(pattern.matches(&key));
        assert!(!pattern.matches(&CacheKey::new(QueryKind::Appointment).with(8)));
    }

    #[test]
    fn display_uses_bracket_notation() {
        assert_eq!(CacheKey::own_profile().to_string(), "[profile, self]");
        assert_eq!(
            KeyPattern::kind(QueryKind::DashboardStats).to_string(),
            "[dashboardStats]"
        );
    }
}
