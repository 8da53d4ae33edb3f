// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-over-HTTPS transport for the remote clinic API.
//!
//! Every request carries the identity's bearer token and a fresh
//! `x-request-id`. Timeouts are enforced by the HTTP client; failures are
//! reported as [`ClientError::RemoteCall`] and never retried here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;
use uuid::Uuid;

use super::{AppointmentParty, Backend, BackendConnector};
use crate::auth::{Identity, Role};
use crate::error::ClientError;
use crate::models::{
    Appointment, AppointmentStats, AppointmentStatus, DashboardStats, Doctor, Notification, Nurse,
    Patient, PrincipalId, Profile, Timestamp,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds [`HttpBackend`]s that share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    base_url: Url,
    http: Client,
}

impl HttpConnector {
    /// Create a connector for the API rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = normalize_base(base_url)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::remote("connect", format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl BackendConnector for HttpConnector {
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn Backend>, ClientError> {
        Ok(Arc::new(HttpBackend {
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            token: identity.token().map(str::to_string),
        }))
    }
}

/// Ensure the base URL ends with `/` so relative joins keep its path.
fn normalize_base(base_url: &str) -> Result<Url, ClientError> {
    let mut raw = base_url.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| ClientError::remote("connect", format!("invalid API URL: {e}")))
}

/// Remote API client for one identity.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http: Client,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BookRequest<'a> {
    doctor_id: &'a PrincipalId,
    date_time: Timestamp,
}

#[derive(Deserialize)]
struct BookResponse {
    id: u64,
}

#[derive(Serialize)]
struct StatusRequest<'a> {
    status: AppointmentStatus,
    notes: &'a str,
}

#[derive(Serialize)]
struct RoleRequest {
    role: Role,
}

impl HttpBackend {
    fn endpoint(&self, operation: &'static str, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::remote(operation, format!("invalid endpoint {path}: {e}")))
    }

    fn request(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, ClientError> {
        let url = self.endpoint(operation, path)?;
        let mut builder = self
            .http
            .request(method, url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn send(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::remote(operation, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(operation, status = %status, error = %e, "Failed to read error response body");
                String::new()
            }
        };
        Err(status_error(operation, status, &body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<T, ClientError> {
        let builder = self.request(operation, Method::GET, path)?;
        let response = self.send(operation, builder).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::remote(operation, format!("invalid response: {e}")))
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ClientError> {
        let builder = self.request(operation, method, path)?.json(body);
        self.send(operation, builder).await
    }

    async fn post_empty(&self, operation: &'static str, path: &str) -> Result<(), ClientError> {
        let builder = self.request(operation, Method::POST, path)?;
        self.send(operation, builder).await.map(|_| ())
    }
}

/// Map a non-success HTTP status to a remote call failure.
fn status_error(operation: &'static str, status: StatusCode, body: &str) -> ClientError {
    let body = body.trim();
    if body.is_empty() {
        ClientError::remote(operation, format!("HTTP {status}"))
    } else {
        ClientError::remote(operation, format!("HTTP {status}: {body}"))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_profile(&self) -> Result<Option<Profile>, ClientError> {
        self.get_json("getCallerUserProfile", "v1/profile/me").await
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), ClientError> {
        self.send_json("saveCallerUserProfile", Method::PUT, "v1/profile/me", profile)
            .await
            .map(|_| ())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, ClientError> {
        self.get_json("getDoctors", "v1/doctors").await
    }

    async fn get_doctor(&self, id: &PrincipalId) -> Result<Option<Doctor>, ClientError> {
        self.get_json("getDoctor", &format!("v1/doctors/{id}")).await
    }

    async fn add_doctor(&self, doctor: &Doctor) -> Result<(), ClientError> {
        self.send_json("addDoctor", Method::POST, "v1/doctors", doctor)
            .await
            .map(|_| ())
    }

    async fn list_nurses(&self) -> Result<Vec<Nurse>, ClientError> {
        self.get_json("getNurses", "v1/nurses").await
    }

    async fn get_nurse(&self, id: &PrincipalId) -> Result<Option<Nurse>, ClientError> {
        self.get_json("getNurse", &format!("v1/nurses/{id}")).await
    }

    async fn add_nurse(&self, nurse: &Nurse) -> Result<(), ClientError> {
        self.send_json("addNurse", Method::POST, "v1/nurses", nurse)
            .await
            .map(|_| ())
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, ClientError> {
        self.get_json("getPatients", "v1/patients").await
    }

    async fn get_patient(&self, id: &PrincipalId) -> Result<Option<Patient>, ClientError> {
        self.get_json("getPatient", &format!("v1/patients/{id}")).await
    }

    async fn register_patient(&self, patient: &Patient) -> Result<(), ClientError> {
        self.send_json("registerPatient", Method::POST, "v1/patients", patient)
            .await
            .map(|_| ())
    }

    async fn list_appointments(
        &self,
        party: AppointmentParty,
        id: &PrincipalId,
    ) -> Result<Vec<Appointment>, ClientError> {
        let operation = match party {
            AppointmentParty::Patient => "getAppointmentsForPatient",
            AppointmentParty::Doctor => "getAppointmentsForDoctor",
        };
        self.get_json(operation, &format!("v1/appointments?{}={id}", party.as_str()))
            .await
    }

    async fn get_appointment(&self, id: u64) -> Result<Option<Appointment>, ClientError> {
        self.get_json("getAppointment", &format!("v1/appointments/{id}"))
            .await
    }

    async fn book_appointment(
        &self,
        doctor_id: &PrincipalId,
        time: Timestamp,
    ) -> Result<u64, ClientError> {
        let operation = "bookAppointment";
        let body = BookRequest {
            doctor_id,
            date_time: time,
        };
        let response = self
            .send_json(operation, Method::POST, "v1/appointments", &body)
            .await?;
        let booked: BookResponse = response
            .json()
            .await
            .map_err(|e| ClientError::remote(operation, format!("invalid response: {e}")))?;
        Ok(booked.id)
    }

    async fn update_appointment_status(
        &self,
        id: u64,
        status: AppointmentStatus,
        notes: &str,
    ) -> Result<(), ClientError> {
        let body = StatusRequest { status, notes };
        self.send_json(
            "updateAppointmentStatus",
            Method::PUT,
            &format!("v1/appointments/{id}/status"),
            &body,
        )
        .await
        .map(|_| ())
    }

    async fn cancel_appointment(&self, id: u64) -> Result<(), ClientError> {
        self.post_empty("cancelAppointment", &format!("v1/appointments/{id}/cancel"))
            .await
    }

    async fn list_notifications(
        &self,
        user: &PrincipalId,
    ) -> Result<Vec<Notification>, ClientError> {
        self.get_json("getNotifications", &format!("v1/users/{user}/notifications"))
            .await
    }

    async fn mark_notification_seen(
        &self,
        user: &PrincipalId,
        id: u64,
    ) -> Result<(), ClientError> {
        self.post_empty(
            "markNotificationSeen",
            &format!("v1/users/{user}/notifications/{id}/seen"),
        )
        .await
    }

    async fn assign_role(&self, user: &PrincipalId, role: Role) -> Result<(), ClientError> {
        self.send_json(
            "assignAppRole",
            Method::PUT,
            &format!("v1/users/{user}/role"),
            &RoleRequest { role },
        )
        .await
        .map(|_| ())
    }

    async fn get_dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        self.get_json("getDashboardStats", "v1/stats/dashboard").await
    }

    async fn get_appointment_stats(&self) -> Result<AppointmentStats, ClientError> {
        self.get_json("getAppointmentStats", "v1/stats/appointments")
            .await
    }

    async fn seed_demo_data(&self) -> Result<(), ClientError> {
        self.post_empty("seedData", "v1/admin/seed").await
    }
}
