// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Which cache entries each mutation makes stale.
//!
//! One row per mutating operation. Invalidation is coarse (by kind rather
//! than exact discriminator) so a cross-entity mutation, such as an admin
//! booking on a doctor's behalf, never leaves a stale list behind. The table
//! is applied only after the mutation succeeded.

use super::key::{KeyPattern, QueryKind, SELF_DISCRIMINATOR};
use super::store::EntityCache;

/// A mutating remote operation, with the discriminators its rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    SaveProfile,
    AddDoctor,
    AddNurse,
    RegisterPatient,
    BookAppointment,
    UpdateAppointmentStatus { appointment_id: u64 },
    CancelAppointment,
    MarkNotificationSeen,
    AssignRole,
    SeedDemoData,
}

impl Mutation {
    /// Remote operation name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SaveProfile => "saveCallerUserProfile",
            Mutation::AddDoctor => "addDoctor",
            Mutation::AddNurse => "addNurse",
            Mutation::RegisterPatient => "registerPatient",
            Mutation::BookAppointment => "bookAppointment",
            Mutation::UpdateAppointmentStatus { .. } => "updateAppointmentStatus",
            Mutation::CancelAppointment => "cancelAppointment",
            Mutation::MarkNotificationSeen => "markNotificationSeen",
            Mutation::AssignRole => "assignAppRole",
            Mutation::SeedDemoData => "seedData",
        }
    }

    /// Key patterns to mark stale once this mutation has succeeded.
    pub fn invalidates(&self) -> Vec<KeyPattern> {
        use QueryKind::*;

        match *self {
            Mutation::SaveProfile | Mutation::AssignRole => {
                vec![KeyPattern::kind(Profile).with(SELF_DISCRIMINATOR)]
            }
            Mutation::AddDoctor => vec![KeyPattern::kind(Doctors), KeyPattern::kind(DashboardStats)],
            Mutation::AddNurse => vec![KeyPattern::kind(Nurses), KeyPattern::kind(DashboardStats)],
            Mutation::RegisterPatient => vec![KeyPattern::kind(Patients)],
            Mutation::BookAppointment | Mutation::CancelAppointment => {
                vec![KeyPattern::kind(Appointments)]
            }
            Mutation::UpdateAppointmentStatus { appointment_id } => vec![
                KeyPattern::kind(Appointments),
                KeyPattern::kind(Appointment).with(appointment_id),
            ],
            Mutation::MarkNotificationSeen => vec![KeyPattern::kind(Notifications)],
            Mutation::SeedDemoData => vec![
                KeyPattern::kind(Doctors),
                KeyPattern::kind(Nurses),
                KeyPattern::kind(DashboardStats),
            ],
        }
    }

    /// Mark this mutation's dependents stale. Returns entries marked.
    pub fn apply(&self, cache: &EntityCache) -> usize {
        self.invalidates()
            .iter()
            .map(|pattern| cache.invalidate(pattern))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::CacheKey;

    fn matches_any(mutation: Mutation, key: &CacheKey) -> bool {
        mutation.invalidates().iter().any(|p| p.matches(key))
    }

    #[test]
    fn booking_invalidates_every_appointment_list() {
        let patient = CacheKey::new(QueryKind::Appointments).with("patient").with("p1");
        let doctor = CacheKey::new(QueryKind::Appointments).with("doctor").with("d1");
        assert!(matches_any(Mutation::BookAppointment, &patient));
        assert!(matches_any(Mutation::BookAppointment, &doctor));
        assert!(!matches_any(
            Mutation::BookAppointment,
            &CacheKey::new(QueryKind::Appointment).with(7)
        ));
    }

    #[test]
    fn status_update_also_invalidates_that_appointment() {
        let m = Mutation::UpdateAppointmentStatus { appointment_id: 7 };
        assert!(matches_any(m, &CacheKey::new(QueryKind::Appointment).with(7)));
        assert!(!matches_any(m, &CacheKey::new(QueryKind::Appointment).with(8)));
        assert!(matches_any(m, &CacheKey::new(QueryKind::Appointments).with("doctor").with("d1")));
    }

    #[test]
    fn staff_changes_invalidate_dashboard_stats() {
        let stats = CacheKey::new(QueryKind::DashboardStats);
        assert!(matches_any(Mutation::AddDoctor, &stats));
        assert!(matches_any(Mutation::AddNurse, &stats));
        assert!(matches_any(Mutation::SeedDemoData, &stats));
        assert!(!matches_any(Mutation::RegisterPatient, &stats));
    }

    #[test]
    fn profile_rows_target_own_profile_only() {
        for m in [Mutation::SaveProfile, Mutation::AssignRole] {
            assert!(matches_any(m, &CacheKey::own_profile()));
            assert!(!matches_any(m, &CacheKey::new(QueryKind::Patients)));
        }
    }

    #[test]
    fn notification_seen_covers_all_users() {
        let key = CacheKey::new(QueryKind::Notifications).with("aaaaa-aa");
        assert!(matches_any(Mutation::MarkNotificationSeen, &key));
    }

    #[test]
    fn every_mutation_invalidates_something() {
        let all = [
            Mutation::SaveProfile,
            Mutation::AddDoctor,
            Mutation::AddNurse,
            Mutation::RegisterPatient,
            Mutation::BookAppointment,
            Mutation::UpdateAppointmentStatus { appointment_id: 1 },
            Mutation::CancelAppointment,
            Mutation::MarkNotificationSeen,
            Mutation::AssignRole,
            Mutation::SeedDemoData,
        ];
        for m in all {
            assert!(!m.invalidates().is_empty(), "{} has no rule", m.name());
        }
    }
}
