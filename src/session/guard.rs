// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-screen access decisions.
//!
//! ## Evaluation Order
//!
//! 1. No identity → `Denied(NotLoggedIn)`, without waiting on any fetch
//! 2. Profile still loading → `Loading`
//! 3. No profile → `Denied(NoProfile)`
//! 4. Role not allowed → `Denied(WrongRole)`
//! 5. Otherwise → `Allow`
//!
//! The order is fixed: a logged-out user never sees a spinner, and a fully
//! loaded user with the wrong role gets a definitive answer.

use super::phase::SessionPhase;
use crate::auth::Role;

/// Why a screen was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialReason {
    NotLoggedIn,
    NoProfile,
    WrongRole,
}

impl DenialReason {
    /// Message shown on the access-denied screen.
    pub fn message(&self) -> &'static str {
        match self {
            DenialReason::NotLoggedIn => "Please log in to access this page.",
            DenialReason::NoProfile => "Please complete your profile setup.",
            DenialReason::WrongRole => "You don't have permission to access this page.",
        }
    }
}

/// Output of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Denied(DenialReason),
    Loading,
    Allow,
}

/// Decide access for a caller in `phase` with `profile_role` to a screen
/// allowing `required` roles.
pub fn guard(required: &[Role], phase: SessionPhase, profile_role: Option<Role>) -> Decision {
    match phase {
        SessionPhase::Unauthenticated => Decision::Denied(DenialReason::NotLoggedIn),
        SessionPhase::ProfileLoading => Decision::Loading,
        SessionPhase::NeedsOnboarding | SessionPhase::ProfileUnavailable => {
            Decision::Denied(DenialReason::NoProfile)
        }
        SessionPhase::Active => match profile_role {
            None => Decision::Denied(DenialReason::NoProfile),
            Some(role) if required.contains(&role) => Decision::Allow,
            Some(_) => Decision::Denied(DenialReason::WrongRole),
        },
    }
}

/// Role-guarded screens and the roles each one admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    PatientDashboard,
    PatientProfile,
    DoctorList,
    DoctorDetail,
    BookAppointment,
    PatientAppointments,
    Notifications,
    DoctorDashboard,
    DoctorSchedule,
    AppointmentDetail,
    AdminDashboard,
}

const PATIENT_ONLY: &[Role] = &[Role::Patient];
const DOCTOR_ONLY: &[Role] = &[Role::Doctor];
const ADMIN_ONLY: &[Role] = &[Role::Admin];
const INBOX_ROLES: &[Role] = &[Role::Patient, Role::Doctor, Role::Admin];

impl Screen {
    pub const ALL: [Screen; 11] = [
        Screen::PatientDashboard,
        Screen::PatientProfile,
        Screen::DoctorList,
        Screen::DoctorDetail,
        Screen::BookAppointment,
        Screen::PatientAppointments,
        Screen::Notifications,
        Screen::DoctorDashboard,
        Screen::DoctorSchedule,
        Screen::AppointmentDetail,
        Screen::AdminDashboard,
    ];

    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Screen::PatientDashboard
            | Screen::PatientProfile
            | Screen::DoctorList
            | Screen::DoctorDetail
            | Screen::BookAppointment
            | Screen::PatientAppointments => PATIENT_ONLY,
            Screen::Notifications => INBOX_ROLES,
            Screen::DoctorDashboard | Screen::DoctorSchedule | Screen::AppointmentDetail => {
                DOCTOR_ONLY
            }
            Screen::AdminDashboard => ADMIN_ONLY,
        }
    }

    /// Route template of the screen.
    pub fn path(&self) -> &'static str {
        match self {
            Screen::PatientDashboard => "/patient",
            Screen::PatientProfile => "/patient/profile",
            Screen::DoctorList => "/patient/doctors",
            Screen::DoctorDetail => "/patient/doctors/$doctorId",
            Screen::BookAppointment => "/patient/book",
            Screen::PatientAppointments => "/patient/appointments",
            Screen::Notifications => "/notifications",
            Screen::DoctorDashboard => "/doctor",
            Screen::DoctorSchedule => "/doctor/schedule",
            Screen::AppointmentDetail => "/doctor/appointment/$appointmentId",
            Screen::AdminDashboard => "/admin",
        }
    }

    pub fn guard(&self, phase: SessionPhase, profile_role: Option<Role>) -> Decision {
        guard(self.allowed_roles(), phase, profile_role)
    }
}
