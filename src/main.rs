// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use clinic_session::auth::TokenIdentityProvider;
use clinic_session::backend::HttpConnector;
use clinic_session::cache::EntityCache;
use clinic_session::config::ClientConfig;
use clinic_session::logging::init_tracing;
use clinic_session::session::{Decision, Screen, SessionPhase};
use clinic_session::{ClientError, ClinicSession};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = ClientConfig::from_env();
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, code = err.error_code(), "Session check failed");
            ExitCode::FAILURE
        }
    }
}

/// Sign in, resolve the session phase and report which screens are open.
async fn run(config: ClientConfig) -> Result<(), ClientError> {
    info!(api = %config.api_url, capacity = config.cache_capacity, "Starting clinic session");

    let connector = HttpConnector::new(&config.api_url, config.request_timeout)?;
    let identity = TokenIdentityProvider::new(config.id_token.clone());
    let session = ClinicSession::new(
        Arc::new(identity),
        Arc::new(connector),
        EntityCache::new(config.cache_capacity, config.cache_ttl),
    );

    session.login().await?;

    let phase = session.resolve_phase().await;
    info!(?phase, "Session phase resolved");
    if phase == SessionPhase::ProfileUnavailable {
        if let Some(err) = session.profile_snapshot().error {
            return Err(err);
        }
    }

    for screen in Screen::ALL {
        match session.check_access(screen) {
            Decision::Allow => info!(path = screen.path(), "Screen available"),
            Decision::Loading => info!(path = screen.path(), "Screen waiting on profile"),
            Decision::Denied(reason) => {
                info!(path = screen.path(), reason = reason.message(), "Screen denied")
            }
        }
    }

    session.logout().await
}
