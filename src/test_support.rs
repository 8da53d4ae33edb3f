// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory clinic API for tests.
//!
//! [`FakeServer`] holds shared data and per-operation call counters. Calls can
//! be held open behind a gate (to observe in-flight state) or made to fail.
//! [`FakeIdentity`] lets a test switch the signed-in identity directly.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::auth::{AuthError, Identity, IdentityProvider, Role};
use crate::backend::{AppointmentParty, Backend, BackendConnector};
use crate::error::ClientError;
use crate::models::{
    Appointment, AppointmentStats, AppointmentStatus, DashboardStats, Doctor, Notification, Nurse,
    Patient, PrincipalId, Profile, Timestamp,
};

pub(crate) fn principal(text: &str) -> PrincipalId {
    PrincipalId::parse(text).unwrap()
}

pub(crate) fn identity(text: &str) -> Identity {
    Identity::new(principal(text)).with_token(format!("token-{text}"))
}

pub(crate) fn profile(name: &str, role: Role) -> Profile {
    Profile {
        name: name.to_string(),
        role,
        age: None,
        specialty: None,
        department: None,
    }
}

/// A gate that stays closed until opened; every waiter passes once open.
#[derive(Clone)]
pub(crate) struct Gate(Arc<watch::Sender<bool>>);

impl Gate {
    fn new(open: bool) -> Self {
        Gate(Arc::new(watch::Sender::new(open)))
    }

    pub(crate) fn open(&self) {
        self.0.send_replace(true);
    }

    pub(crate) fn close(&self) {
        self.0.send_replace(false);
    }

    async fn pass(&self) {
        let mut rx = self.0.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[derive(Default)]
struct FakeData {
    profiles: HashMap<PrincipalId, Profile>,
    doctors: Vec<Doctor>,
    nurses: Vec<Nurse>,
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
    notifications: Vec<Notification>,
    next_id: u64,
}

pub(crate) struct FakeServer {
    data: Mutex<FakeData>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
    gated: Mutex<HashSet<&'static str>>,
    gate: Gate,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self {
            data: Mutex::new(FakeData::default()),
            calls: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            gated: Mutex::new(HashSet::new()),
            gate: Gate::new(true),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeServer {
    pub(crate) fn calls(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    pub(crate) fn fail(&self, operation: &'static str) {
        lock(&self.failing).insert(operation);
    }

    pub(crate) fn recover(&self, operation: &'static str) {
        lock(&self.failing).remove(operation);
    }

    /// Hold calls to `operation` until [`FakeServer::release`].
    pub(crate) fn hold(&self, operation: &'static str) {
        lock(&self.gated).insert(operation);
        self.gate.close();
    }

    pub(crate) fn release(&self) {
        lock(&self.gated).clear();
        self.gate.open();
    }

    pub(crate) fn set_profile(&self, who: &PrincipalId, profile: Profile) {
        lock(&self.data).profiles.insert(who.clone(), profile);
    }

    pub(crate) fn add_doctor_record(&self, doctor: Doctor) {
        lock(&self.data).doctors.push(doctor);
    }

    pub(crate) fn push_notification(&self, user: &PrincipalId, message: &str) -> u64 {
        let mut data = lock(&self.data);
        data.next_id += 1;
        let id = data.next_id;
        data.notifications.push(Notification {
            id,
            user_id: user.clone(),
            seen: false,
            message: message.to_string(),
            timestamp: Timestamp(id as i64),
        });
        id
    }

    pub(crate) fn patients(&self) -> Vec<Patient> {
        lock(&self.data).patients.clone()
    }

    async fn enter(&self, operation: &'static str) -> Result<(), ClientError> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        let gated = lock(&self.gated).contains(operation);
        if gated {
            self.gate.pass().await;
        }
        if lock(&self.failing).contains(operation) {
            return Err(ClientError::remote(operation, "injected failure"));
        }
        Ok(())
    }
}

/// Backend view of [`FakeServer`] for one caller.
pub(crate) struct FakeBackend {
    server: Arc<FakeServer>,
    caller: PrincipalId,
}

#[async_trait]
impl Backend for FakeBackend {
    async fn get_profile(&self) -> Result<Option<Profile>, ClientError> {
        self.server.enter("getCallerUserProfile").await?;
        Ok(lock(&self.server.data).profiles.get(&self.caller).cloned())
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), ClientError> {
        self.server.enter("saveCallerUserProfile").await?;
        self.server.set_profile(&self.caller, profile.clone());
        Ok(())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, ClientError> {
        self.server.enter("getDoctors").await?;
        Ok(lock(&self.server.data).doctors.clone())
    }

    async fn get_doctor(&self, id: &PrincipalId) -> Result<Option<Doctor>, ClientError> {
        self.server.enter("getDoctor").await?;
        Ok(lock(&self.server.data).doctors.iter().find(|d| &d.id == id).cloned())
    }

    async fn add_doctor(&self, doctor: &Doctor) -> Result<(), ClientError> {
        self.server.enter("addDoctor").await?;
        self.server.add_doctor_record(doctor.clone());
        Ok(())
    }

    async fn list_nurses(&self) -> Result<Vec<Nurse>, ClientError> {
        self.server.enter("getNurses").await?;
        Ok(lock(&self.server.data).nurses.clone())
    }

    async fn get_nurse(&self, id: &PrincipalId) -> Result<Option<Nurse>, ClientError> {
        self.server.enter("getNurse").await?;
        Ok(lock(&self.server.data).nurses.iter().find(|n| &n.id == id).cloned())
    }

    async fn add_nurse(&self, nurse: &Nurse) -> Result<(), ClientError> {
        self.server.enter("addNurse").await?;
        lock(&self.server.data).nurses.push(nurse.clone());
        Ok(())
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, ClientError> {
        self.server.enter("getPatients").await?;
        Ok(lock(&self.server.data).patients.clone())
    }

    async fn get_patient(&self, id: &PrincipalId) -> Result<Option<Patient>, ClientError> {
        self.server.enter("getPatient").await?;
        Ok(lock(&self.server.data).patients.iter().find(|p| &p.id == id).cloned())
    }

    async fn register_patient(&self, patient: &Patient) -> Result<(), ClientError> {
        self.server.enter("registerPatient").await?;
        lock(&self.server.data).patients.push(patient.clone());
        Ok(())
    }

    async fn list_appointments(
        &self,
        party: AppointmentParty,
        id: &PrincipalId,
    ) -> Result<Vec<Appointment>, ClientError> {
        self.server.enter("listAppointments").await?;
        let data = lock(&self.server.data);
        Ok(data
            .appointments
            .iter()
            .filter(|a| match party {
                AppointmentParty::Patient => &a.patient_id == id,
                AppointmentParty::Doctor => &a.doctor_id == id,
            })
            .cloned()
            .collect())
    }

    async fn get_appointment(&self, id: u64) -> Result<Option<Appointment>, ClientError> {
        self.server.enter("getAppointment").await?;
        Ok(lock(&self.server.data).appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn book_appointment(
        &self,
        doctor_id: &PrincipalId,
        time: Timestamp,
    ) -> Result<u64, ClientError> {
        self.server.enter("bookAppointment").await?;
        let mut data = lock(&self.server.data);
        data.next_id += 1;
        let id = data.next_id;
        data.appointments.push(Appointment {
            id,
            status: AppointmentStatus::Scheduled,
            doctor_id: doctor_id.clone(),
            patient_id: self.caller.clone(),
            notes: String::new(),
            date_time: time,
        });
        Ok(id)
    }

    async fn update_appointment_status(
        &self,
        id: u64,
        status: AppointmentStatus,
        notes: &str,
    ) -> Result<(), ClientError> {
        self.server.enter("updateAppointmentStatus").await?;
        let mut data = lock(&self.server.data);
        let apt = data
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ClientError::remote("updateAppointmentStatus", "Appointment not found"))?;
        apt.status = status;
        apt.notes = notes.to_string();
        Ok(())
    }

    async fn cancel_appointment(&self, id: u64) -> Result<(), ClientError> {
        self.server.enter("cancelAppointment").await?;
        let mut data = lock(&self.server.data);
        if let Some(apt) = data.appointments.iter_mut().find(|a| a.id == id) {
            apt.status = AppointmentStatus::Cancelled;
        }
        Ok(())
    }

    async fn list_notifications(
        &self,
        user: &PrincipalId,
    ) -> Result<Vec<Notification>, ClientError> {
        self.server.enter("getNotifications").await?;
        let data = lock(&self.server.data);
        Ok(data
            .notifications
            .iter()
            .filter(|n| &n.user_id == user)
            .cloned()
            .collect())
    }

    async fn mark_notification_seen(&self, user: &PrincipalId, id: u64) -> Result<(), ClientError> {
        self.server.enter("markNotificationSeen").await?;
        let mut data = lock(&self.server.data);
        if let Some(n) = data
            .notifications
            .iter_mut()
            .find(|n| n.id == id && &n.user_id == user)
        {
            n.seen = true;
        }
        Ok(())
    }

    async fn assign_role(&self, user: &PrincipalId, role: Role) -> Result<(), ClientError> {
        self.server.enter("assignAppRole").await?;
        let mut data = lock(&self.server.data);
        if let Some(p) = data.profiles.get_mut(user) {
            p.role = role;
        }
        Ok(())
    }

    async fn get_dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        self.server.enter("getDashboardStats").await?;
        let data = lock(&self.server.data);
        Ok(DashboardStats {
            total_patients: data.patients.len() as u64,
            total_doctors: data.doctors.len() as u64,
            total_nurses: data.nurses.len() as u64,
            total_appointments: data.appointments.len() as u64,
        })
    }

    async fn get_appointment_stats(&self) -> Result<AppointmentStats, ClientError> {
        self.server.enter("getAppointmentStats").await?;
        let data = lock(&self.server.data);
        let count = |s: AppointmentStatus| data.appointments.iter().filter(|a| a.status == s).count() as u64;
        Ok(AppointmentStats {
            total: data.appointments.len() as u64,
            scheduled: count(AppointmentStatus::Scheduled),
            completed: count(AppointmentStatus::Completed),
            cancelled: count(AppointmentStatus::Cancelled),
        })
    }

    async fn seed_demo_data(&self) -> Result<(), ClientError> {
        self.server.enter("seedData").await?;
        let mut data = lock(&self.server.data);
        data.doctors.push(Doctor {
            id: principal("ddddd-dd"),
            name: "Dr. Demo".to_string(),
            specialty: "General Practice".to_string(),
        });
        data.nurses.push(Nurse {
            id: principal("nnnnn-nn"),
            name: "Nurse Demo".to_string(),
            department: "Triage".to_string(),
        });
        Ok(())
    }
}

/// Connector handing out [`FakeBackend`]s over one shared [`FakeServer`].
pub(crate) struct FakeConnector {
    pub(crate) server: Arc<FakeServer>,
    connects: Mutex<usize>,
    refusing: Mutex<bool>,
    gate: Gate,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self {
            server: Arc::new(FakeServer::default()),
            connects: Mutex::new(0),
            refusing: Mutex::new(false),
            gate: Gate::new(true),
        }
    }
}

impl FakeConnector {
    /// Connector whose construction waits for [`FakeConnector::release`].
    pub(crate) fn gated() -> Self {
        Self {
            gate: Gate::new(false),
            ..Self::default()
        }
    }

    pub(crate) fn release(&self) {
        self.gate.open();
    }

    pub(crate) fn connects(&self) -> usize {
        *lock(&self.connects)
    }

    /// Fail every construction until [`FakeConnector::accept`].
    pub(crate) fn refuse(&self) {
        *lock(&self.refusing) = true;
    }

    pub(crate) fn accept(&self) {
        *lock(&self.refusing) = false;
    }
}

#[async_trait]
impl BackendConnector for FakeConnector {
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn Backend>, ClientError> {
        *lock(&self.connects) += 1;
        self.gate.pass().await;
        if *lock(&self.refusing) {
            return Err(ClientError::remote("connect", "connection refused"));
        }
        Ok(Arc::new(FakeBackend {
            server: self.server.clone(),
            caller: identity.principal().clone(),
        }))
    }
}

/// Identity provider whose current identity is set directly by the test.
#[derive(Default)]
pub(crate) struct FakeIdentity {
    current: Mutex<Option<Identity>>,
    next: Mutex<Option<Identity>>,
    logins: Mutex<usize>,
    logout_fails: Mutex<bool>,
}

impl FakeIdentity {
    pub(crate) fn signed_in(text: &str) -> Self {
        let provider = Self::default();
        provider.set(Some(identity(text)));
        provider
    }

    /// Switch identity behind the session's back.
    pub(crate) fn set(&self, identity: Option<Identity>) {
        *lock(&self.current) = identity;
    }

    /// Identity the next successful `login` signs in as.
    pub(crate) fn queue_login(&self, identity: Identity) {
        *lock(&self.next) = Some(identity);
    }

    pub(crate) fn fail_logout(&self) {
        *lock(&self.logout_fails) = true;
    }

    pub(crate) fn logins(&self) -> usize {
        *lock(&self.logins)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn current_identity(&self) -> Option<Identity> {
        lock(&self.current).clone()
    }

    async fn login(&self) -> Result<(), AuthError> {
        *lock(&self.logins) += 1;
        if lock(&self.current).is_some() {
            return Err(AuthError::AlreadyAuthenticated);
        }
        let next = lock(&self.next).take().ok_or(AuthError::MissingToken)?;
        self.set(Some(next));
        Ok(())
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.set(None);
        if *lock(&self.logout_fails) {
            return Err(AuthError::TokenExpired);
        }
        Ok(())
    }
}
