// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Backend client bound to the current identity.
//!
//! The binding owns at most one [`ClientHandle`]. Asking again with the same
//! identity returns the same handle; asking with a different identity drops
//! the old one immediately. Calls already running on a dropped handle finish
//! on their own, and the cache generation guarantees their results never land
//! under the new identity.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::Identity;
use crate::backend::{Backend, BackendConnector};
use crate::error::ClientError;

/// Request-capable client scoped to one identity.
#[derive(Clone)]
pub struct ClientHandle {
    identity: Identity,
    backend: Arc<dyn Backend>,
    epoch: u64,
}

impl ClientHandle {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Both handles wrap the same constructed client.
    pub fn same_client(&self, other: &ClientHandle) -> bool {
        self.epoch == other.epoch && Arc::ptr_eq(&self.backend, &other.backend)
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("principal", self.identity.principal())
            .field("epoch", &self.epoch)
            .finish()
    }
}

type Construction = watch::Receiver<Option<Result<ClientHandle, ClientError>>>;

enum Slot {
    Empty,
    Connecting {
        identity: Identity,
        done: Construction,
    },
    Ready(ClientHandle),
    Failed {
        identity: Identity,
        error: ClientError,
    },
}

struct BindingState {
    slot: Slot,
    epoch: u64,
}

/// Memoized backend client for the active identity.
pub struct ClientBinding {
    connector: Arc<dyn BackendConnector>,
    state: Mutex<BindingState>,
}

enum Step {
    Ready(ClientHandle),
    Join(Construction),
    Connect(u64, watch::Sender<Option<Result<ClientHandle, ClientError>>>),
}

impl ClientBinding {
    pub fn new(connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            connector,
            state: Mutex::new(BindingState {
                slot: Slot::Empty,
                epoch: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BindingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Client for `identity`, constructing it if needed.
    ///
    /// Anonymous callers get [`ClientError::BindingUnavailable`] and any
    /// existing handle is dropped. So is a construction overtaken by an
    /// identity change.
    pub async fn get_client(&self, identity: Option<&Identity>) -> Result<ClientHandle, ClientError> {
        let Some(identity) = identity else {
            self.reset();
            return Err(ClientError::BindingUnavailable);
        };

        let step = {
            let mut state = self.lock();
            let existing = match &state.slot {
                Slot::Ready(handle) if &handle.identity == identity => {
                    Some(Step::Ready(handle.clone()))
                }
                Slot::Connecting {
                    identity: pending,
                    done,
                } if pending == identity && done.has_changed().is_ok() => {
                    Some(Step::Join(done.clone()))
                }
                _ => None,
            };

            match existing {
                Some(step) => step,
                None => {
                    if !matches!(state.slot, Slot::Empty) {
                        info!(principal = %identity.principal(), "Replacing backend binding");
                    }
                    state.epoch += 1;
                    let epoch = state.epoch;
                    let (tx, rx) = watch::channel(None);
                    state.slot = Slot::Connecting {
                        identity: identity.clone(),
                        done: rx,
                    };
                    Step::Connect(epoch, tx)
                }
            }
        };

        match step {
            Step::Ready(handle) => Ok(handle),
            Step::Join(mut done) => {
                let outcome = match done.wait_for(Option::is_some).await {
                    Ok(result) => result.clone(),
                    Err(_) => None,
                };
                let handle = outcome.unwrap_or(Err(ClientError::BindingUnavailable))?;
                // The identity may have changed while this caller was parked.
                if self.lock().epoch != handle.epoch {
                    return Err(ClientError::BindingUnavailable);
                }
                Ok(handle)
            }
            Step::Connect(epoch, tx) => {
                debug!(principal = %identity.principal(), epoch, "Constructing backend client");
                let result = self
                    .connector
                    .connect(identity)
                    .await
                    .map(|backend| ClientHandle {
                        identity: identity.clone(),
                        backend,
                        epoch,
                    });
                let result = self.finish(identity, epoch, result);
                let _ = tx.send(Some(result.clone()));
                result
            }
        }
    }

    /// Store a finished construction if it still belongs to the active epoch.
    fn finish(
        &self,
        identity: &Identity,
        epoch: u64,
        result: Result<ClientHandle, ClientError>,
    ) -> Result<ClientHandle, ClientError> {
        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(epoch, "Discarding backend client built for a previous identity");
            return Err(ClientError::BindingUnavailable);
        }
        match &result {
            Ok(handle) => state.slot = Slot::Ready(handle.clone()),
            Err(err) => {
                warn!(principal = %identity.principal(), error = %err, "Backend client construction failed");
                state.slot = Slot::Failed {
                    identity: identity.clone(),
                    error: err.clone(),
                };
            }
        }
        result
    }

    /// Ready handle, if any, without constructing.
    pub fn handle(&self) -> Option<ClientHandle> {
        match &self.lock().slot {
            Slot::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// A client is under construction.
    pub fn is_fetching(&self) -> bool {
        matches!(
            &self.lock().slot,
            Slot::Connecting { done, .. } if done.has_changed().is_ok()
        )
    }

    /// Error from the last construction, while it has not been retried.
    pub fn failure(&self) -> Option<ClientError> {
        match &self.lock().slot {
            Slot::Failed { error, .. } => Some(error.clone()),
            _ => None,
        }
    }

    /// Identity the binding currently belongs to, ready or not.
    pub fn bound_identity(&self) -> Option<Identity> {
        match &self.lock().slot {
            Slot::Empty => None,
            Slot::Connecting { identity, .. } | Slot::Failed { identity, .. } => Some(identity.clone()),
            Slot::Ready(handle) => Some(handle.identity.clone()),
        }
    }

    /// Drop the handle. Any construction in progress is discarded on arrival.
    pub fn reset(&self) {
        let mut state = self.lock();
        if !matches!(state.slot, Slot::Empty) {
            debug!("Backend binding released");
        }
        state.epoch += 1;
        state.slot = Slot::Empty;
    }
}
