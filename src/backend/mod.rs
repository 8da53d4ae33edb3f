// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote clinic API as consumed by the session layer.
//!
//! [`Backend`] is one async method per remote operation. A backend instance
//! is always scoped to a single identity; [`BackendConnector`] builds one per
//! identity and is what the client binding calls.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{Identity, Role};
use crate::error::ClientError;
use crate::models::{
    Appointment, AppointmentStats, AppointmentStatus, DashboardStats, Doctor, Notification, Nurse,
    Patient, PrincipalId, Profile, Timestamp,
};

pub use http::{HttpBackend, HttpConnector};

/// Which side of an appointment a listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentParty {
    Patient,
    Doctor,
}

impl AppointmentParty {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentParty::Patient => "patient",
            AppointmentParty::Doctor => "doctor",
        }
    }
}

/// Remote clinic API bound to one caller.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_profile(&self) -> Result<Option<Profile>, ClientError>;
    async fn save_profile(&self, profile: &Profile) -> Result<(), ClientError>;

    async fn list_doctors(&self) -> Result<Vec<Doctor>, ClientError>;
    async fn get_doctor(&self, id: &PrincipalId) -> Result<Option<Doctor>, ClientError>;
    async fn add_doctor(&self, doctor: &Doctor) -> Result<(), ClientError>;

    async fn list_nurses(&self) -> Result<Vec<Nurse>, ClientError>;
    async fn get_nurse(&self, id: &PrincipalId) -> Result<Option<Nurse>, ClientError>;
    async fn add_nurse(&self, nurse: &Nurse) -> Result<(), ClientError>;

    async fn list_patients(&self) -> Result<Vec<Patient>, ClientError>;
    async fn get_patient(&self, id: &PrincipalId) -> Result<Option<Patient>, ClientError>;
    async fn register_patient(&self, patient: &Patient) -> Result<(), ClientError>;

    async fn list_appointments(
        &self,
        party: AppointmentParty,
        id: &PrincipalId,
    ) -> Result<Vec<Appointment>, ClientError>;
    async fn get_appointment(&self, id: u64) -> Result<Option<Appointment>, ClientError>;
    async fn book_appointment(
        &self,
        doctor_id: &PrincipalId,
        time: Timestamp,
    ) -> Result<u64, ClientError>;
    async fn update_appointment_status(
        &self,
        id: u64,
        status: AppointmentStatus,
        notes: &str,
    ) -> Result<(), ClientError>;
    async fn cancel_appointment(&self, id: u64) -> Result<(), ClientError>;

    async fn list_notifications(&self, user: &PrincipalId)
        -> Result<Vec<Notification>, ClientError>;
    async fn mark_notification_seen(&self, user: &PrincipalId, id: u64)
        -> Result<(), ClientError>;

    async fn assign_role(&self, user: &PrincipalId, role: Role) -> Result<(), ClientError>;

    async fn get_dashboard_stats(&self) -> Result<DashboardStats, ClientError>;
    async fn get_appointment_stats(&self) -> Result<AppointmentStats, ClientError>;
    async fn seed_demo_data(&self) -> Result<(), ClientError>;
}

/// Builds a backend scoped to one identity.
///
/// Construction may involve a handshake; the binding reports itself as
/// fetching until this resolves.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn Backend>, ClientError>;
}
