// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Clinic Session
//!
//! [`ClinicSession`] ties the identity provider, the client binding and the
//! entity cache together and is the only surface screens talk to.
//!
//! ## Identity changes
//!
//! Every call first compares the provider's current identity with the one
//! last seen. On any change the whole cache is cleared and the binding is
//! dropped before anything else happens, so no read under the new identity
//! can observe data fetched for the old one.
//!
//! ## Reads and mutations
//!
//! - Reads go through the cache. Without a bound client, or without a
//!   required id, a read is disabled and returns an idle state.
//! - Mutations call the backend directly. On success the invalidation table
//!   marks dependent entries stale; on failure nothing is invalidated and the
//!   error is returned.

pub mod guard;
pub mod onboarding;
pub mod phase;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::auth::{AuthError, Identity, IdentityProvider, Role};
use crate::backend::{AppointmentParty, Backend, BackendConnector};
use crate::binding::ClientBinding;
use crate::cache::{CacheKey, EntityCache, FetchStatus, Mutation, QueryKind, QueryState};
use crate::error::{ClientError, ValidationError};
use crate::models::{
    Appointment, AppointmentStats, AppointmentStatus, DashboardStats, Doctor, Notification, Nurse,
    Patient, PrincipalId, Profile, Timestamp,
};
use crate::notifications::NotificationRefresher;

pub use guard::{guard, Decision, DenialReason, Screen};
pub use onboarding::{OnboardingForm, ValidOnboarding};
pub use phase::{ProfileStatus, SessionPhase};

/// Whether a read may run: a client is bound and every id it needs is known.
pub fn read_enabled(binding_ready: bool, discriminator_present: bool) -> bool {
    binding_ready && discriminator_present
}

/// Session-scoped data access and authorization.
pub struct ClinicSession {
    identity: Arc<dyn IdentityProvider>,
    binding: ClientBinding,
    cache: EntityCache,
    last_identity: Mutex<Option<Identity>>,
}

impl ClinicSession {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        connector: Arc<dyn BackendConnector>,
        cache: EntityCache,
    ) -> Self {
        Self {
            identity,
            binding: ClientBinding::new(connector),
            cache,
            last_identity: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn binding(&self) -> &ClientBinding {
        &self.binding
    }

    /// Current identity, after applying any change since the last call.
    pub fn identity(&self) -> Option<Identity> {
        self.sync_identity()
    }

    fn last_identity(&self) -> MutexGuard<'_, Option<Identity>> {
        self.last_identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset cache and binding if the provider's identity moved.
    fn sync_identity(&self) -> Option<Identity> {
        let current = self.identity.current_identity();
        let mut last = self.last_identity();
        if *last != current {
            info!(
                from = ?last.as_ref().map(|i| i.principal().to_string()),
                to = ?current.as_ref().map(|i| i.principal().to_string()),
                "Identity changed, resetting session data"
            );
            self.cache.clear();
            self.binding.reset();
            *last = current.clone();
        }
        current
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Sign in through the identity provider.
    ///
    /// A provider that reports an existing session is logged out and asked
    /// once more.
    pub async fn login(&self) -> Result<(), ClientError> {
        match self.identity.login().await {
            Ok(()) => {}
            Err(AuthError::AlreadyAuthenticated) => {
                info!("Identity provider reports an existing session, logging out and retrying");
                self.logout().await?;
                self.identity.login().await?;
            }
            Err(err) => {
                warn!(error = %err, code = err.error_code(), "Login failed");
                return Err(err.into());
            }
        }

        if let Some(identity) = self.sync_identity() {
            info!(principal = %identity.principal(), "Logged in");
        }
        Ok(())
    }

    /// Sign out and drop every cached entry, whether or not the provider's
    /// logout succeeded.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.identity.logout().await;

        self.cache.clear();
        self.binding.reset();
        *self.last_identity() = self.identity.current_identity();

        match result {
            Ok(()) => {
                info!("Logged out");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Identity provider logout failed, session data cleared anyway");
                Err(err.into())
            }
        }
    }

    // =========================================================================
    // Phase and access
    // =========================================================================

    /// Cached `[profile, self]` state with binding readiness folded in: it is
    /// loading while the client is under construction, settles as an error
    /// when construction failed, and otherwise never counts as fetched
    /// without a client.
    pub fn profile_snapshot(&self) -> QueryState<Option<Profile>> {
        let state = self.cache.snapshot(&CacheKey::own_profile());
        self.with_binding_readiness(state)
    }

    fn with_binding_readiness(
        &self,
        mut state: QueryState<Option<Profile>>,
    ) -> QueryState<Option<Profile>> {
        if let Some(err) = self.binding.failure() {
            state.status = FetchStatus::Error;
            state.error = Some(err);
            state.is_loading = false;
            state.is_fetched = true;
            return state;
        }

        let client_ready = self.binding.handle().is_some();
        state.is_loading = self.binding.is_fetching() || (client_ready && state.is_loading);
        state.is_fetched = client_ready && state.is_fetched;
        state
    }

    fn evaluate(
        identity_present: bool,
        profile: &QueryState<Option<Profile>>,
    ) -> (SessionPhase, Option<Role>) {
        let status = ProfileStatus::from_query(profile);
        (SessionPhase::derive(identity_present, status), status.role())
    }

    /// Phase from what is cached now, without fetching.
    pub fn phase(&self) -> SessionPhase {
        let identity_present = self.sync_identity().is_some();
        Self::evaluate(identity_present, &self.profile_snapshot()).0
    }

    /// Phase after reading the profile, fetching it if needed.
    pub async fn resolve_phase(&self) -> SessionPhase {
        self.resolve().await.0
    }

    async fn resolve(&self) -> (SessionPhase, Option<Role>) {
        if self.sync_identity().is_none() {
            return (SessionPhase::Unauthenticated, None);
        }
        let profile = self.profile().await;
        Self::evaluate(true, &profile)
    }

    /// Gate decision for `screen` from cached state only.
    pub fn check_access(&self, screen: Screen) -> Decision {
        let identity_present = self.sync_identity().is_some();
        let (phase, role) = Self::evaluate(identity_present, &self.profile_snapshot());
        screen.guard(phase, role)
    }

    /// Gate decision for `screen`, waiting for the profile read to settle.
    pub async fn resolve_access(&self, screen: Screen) -> Decision {
        let (phase, role) = self.resolve().await;
        screen.guard(phase, role)
    }

    /// Save the onboarding profile and register the caller as a patient.
    pub async fn complete_onboarding(&self, form: &OnboardingForm) -> Result<(), ClientError> {
        let valid = form.validate()?;
        let identity = self
            .sync_identity()
            .ok_or(ClientError::BindingUnavailable)?;

        self.save_profile(&valid.to_profile()).await?;
        self.register_patient(valid.to_patient(identity.principal()))
            .await?;

        info!(principal = %identity.principal(), "Onboarding completed");
        Ok(())
    }

    pub fn notification_refresher(&self) -> NotificationRefresher {
        NotificationRefresher::new(self.cache.clone())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    async fn query<T, F, Fut>(&self, key: Option<CacheKey>, fetch: F) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(Arc<dyn Backend>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let identity = self.sync_identity();
        let handle = match (&identity, &key) {
            (Some(identity), Some(_)) => match self.binding.get_client(Some(identity)).await {
                Ok(handle) => Some(handle),
                Err(err) => {
                    debug!(error = %err, "Read disabled, no backend client");
                    None
                }
            },
            _ => None,
        };

        let enabled = read_enabled(handle.is_some(), key.is_some());
        match (handle, key) {
            (Some(handle), Some(key)) => {
                let backend = handle.backend().clone();
                self.cache
                    .read(key, move || fetch(backend.clone()), enabled)
                    .await
            }
            _ => QueryState::idle(),
        }
    }

    /// Caller's own profile. `data` is `Some(None)` when none exists yet.
    pub async fn profile(&self) -> QueryState<Option<Profile>> {
        let state = self
            .query(Some(CacheKey::own_profile()), |b| async move {
                b.get_profile().await
            })
            .await;
        self.with_binding_readiness(state)
    }

    pub async fn doctors(&self) -> QueryState<Vec<Doctor>> {
        self.query(Some(CacheKey::new(QueryKind::Doctors)), |b| async move {
            b.list_doctors().await
        })
        .await
    }

    pub async fn doctor(&self, id: Option<&PrincipalId>) -> QueryState<Option<Doctor>> {
        let key = id.map(|id| CacheKey::new(QueryKind::Doctor).with(id));
        let id = id.cloned();
        self.query(key, move |b| {
            let id = id.clone();
            async move {
                match id {
                    Some(id) => b.get_doctor(&id).await,
                    None => Ok(None),
                }
            }
        })
        .await
    }

    pub async fn nurses(&self) -> QueryState<Vec<Nurse>> {
        self.query(Some(CacheKey::new(QueryKind::Nurses)), |b| async move {
            b.list_nurses().await
        })
        .await
    }

    pub async fn nurse(&self, id: Option<&PrincipalId>) -> QueryState<Option<Nurse>> {
        let key = id.map(|id| CacheKey::new(QueryKind::Nurse).with(id));
        let id = id.cloned();
        self.query(key, move |b| {
            let id = id.clone();
            async move {
                match id {
                    Some(id) => b.get_nurse(&id).await,
                    None => Ok(None),
                }
            }
        })
        .await
    }

    pub async fn patients(&self) -> QueryState<Vec<Patient>> {
        self.query(Some(CacheKey::new(QueryKind::Patients)), |b| async move {
            b.list_patients().await
        })
        .await
    }

    pub async fn patient(&self, id: Option<&PrincipalId>) -> QueryState<Option<Patient>> {
        let key = id.map(|id| CacheKey::new(QueryKind::Patient).with(id));
        let id = id.cloned();
        self.query(key, move |b| {
            let id = id.clone();
            async move {
                match id {
                    Some(id) => b.get_patient(&id).await,
                    None => Ok(None),
                }
            }
        })
        .await
    }

    pub async fn appointments_for_patient(
        &self,
        id: Option<&PrincipalId>,
    ) -> QueryState<Vec<Appointment>> {
        self.appointments(AppointmentParty::Patient, id).await
    }

    pub async fn appointments_for_doctor(
        &self,
        id: Option<&PrincipalId>,
    ) -> QueryState<Vec<Appointment>> {
        self.appointments(AppointmentParty::Doctor, id).await
    }

    async fn appointments(
        &self,
        party: AppointmentParty,
        id: Option<&PrincipalId>,
    ) -> QueryState<Vec<Appointment>> {
        let key = id.map(|id| {
            CacheKey::new(QueryKind::Appointments)
                .with(party.as_str())
                .with(id)
        });
        let id = id.cloned();
        self.query(key, move |b| {
            let id = id.clone();
            async move {
                match id {
                    Some(id) => b.list_appointments(party, &id).await,
                    None => Ok(Vec::new()),
                }
            }
        })
        .await
    }

    pub async fn appointment(&self, id: Option<u64>) -> QueryState<Option<Appointment>> {
        let key = id.map(|id| CacheKey::new(QueryKind::Appointment).with(id));
        self.query(key, move |b| async move {
            match id {
                Some(id) => b.get_appointment(id).await,
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn notifications(&self, user: Option<&PrincipalId>) -> QueryState<Vec<Notification>> {
        let key = user.map(|user| CacheKey::new(QueryKind::Notifications).with(user));
        let user = user.cloned();
        self.query(key, move |b| {
            let user = user.clone();
            async move {
                match user {
                    Some(user) => b.list_notifications(&user).await,
                    None => Ok(Vec::new()),
                }
            }
        })
        .await
    }

    pub async fn dashboard_stats(&self) -> QueryState<DashboardStats> {
        self.query(Some(CacheKey::new(QueryKind::DashboardStats)), |b| async move {
            b.get_dashboard_stats().await
        })
        .await
    }

    pub async fn appointment_stats(&self) -> QueryState<AppointmentStats> {
        self.query(Some(CacheKey::new(QueryKind::AppointmentStats)), |b| async move {
            b.get_appointment_stats().await
        })
        .await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    async fn mutate<T, F, Fut>(&self, mutation: Mutation, call: F) -> Result<T, ClientError>
    where
        F: FnOnce(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let identity = self.sync_identity();
        let handle = self.binding.get_client(identity.as_ref()).await?;

        match call(handle.backend().clone()).await {
            Ok(value) => {
                let marked = mutation.apply(&self.cache);
                info!(mutation = mutation.name(), marked, "Mutation succeeded");
                Ok(value)
            }
            Err(err) => {
                warn!(mutation = mutation.name(), error = %err, "Mutation failed");
                Err(err)
            }
        }
    }

    pub async fn save_profile(&self, profile: &Profile) -> Result<(), ClientError> {
        self.mutate(Mutation::SaveProfile, |b| async move {
            b.save_profile(profile).await
        })
        .await
    }

    pub async fn add_doctor(&self, doctor: Doctor) -> Result<(), ClientError> {
        self.mutate(Mutation::AddDoctor, |b| async move {
            b.add_doctor(&doctor).await
        })
        .await
    }

    pub async fn add_nurse(&self, nurse: Nurse) -> Result<(), ClientError> {
        self.mutate(Mutation::AddNurse, |b| async move { b.add_nurse(&nurse).await })
            .await
    }

    pub async fn register_patient(&self, patient: Patient) -> Result<(), ClientError> {
        self.mutate(Mutation::RegisterPatient, |b| async move {
            b.register_patient(&patient).await
        })
        .await
    }

    /// Book with the selected doctor. Returns the new appointment id.
    pub async fn book_appointment(
        &self,
        doctor_id: Option<&PrincipalId>,
        time: Timestamp,
    ) -> Result<u64, ClientError> {
        let doctor_id = doctor_id.ok_or(ValidationError::MissingSelection("a doctor"))?;
        self.mutate(Mutation::BookAppointment, |b| async move {
            b.book_appointment(doctor_id, time).await
        })
        .await
    }

    pub async fn update_appointment_status(
        &self,
        appointment_id: u64,
        status: AppointmentStatus,
        notes: &str,
    ) -> Result<(), ClientError> {
        self.mutate(
            Mutation::UpdateAppointmentStatus { appointment_id },
            |b| async move {
                b.update_appointment_status(appointment_id, status, notes)
                    .await
            },
        )
        .await
    }

    pub async fn cancel_appointment(&self, appointment_id: u64) -> Result<(), ClientError> {
        self.mutate(Mutation::CancelAppointment, |b| async move {
            b.cancel_appointment(appointment_id).await
        })
        .await
    }

    pub async fn mark_notification_seen(
        &self,
        user: &PrincipalId,
        notification_id: u64,
    ) -> Result<(), ClientError> {
        self.mutate(Mutation::MarkNotificationSeen, |b| async move {
            b.mark_notification_seen(user, notification_id).await
        })
        .await
    }

    pub async fn assign_role(&self, user: &PrincipalId, role: Role) -> Result<(), ClientError> {
        self.mutate(Mutation::AssignRole, |b| async move {
            b.assign_role(user, role).await
        })
        .await
    }

    pub async fn seed_demo_data(&self) -> Result<(), ClientError> {
        self.mutate(Mutation::SeedDemoData, |b| async move {
            b.seed_demo_data().await
        })
        .await
    }
}
