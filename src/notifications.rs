// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Manual notification refresh.
//!
//! Unlike cache reads, overlapping refreshes are not de-duplicated: each
//! call invalidates and re-fetches on its own. Per-key single-flight in the
//! cache still keeps the underlying calls to one per key at a time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::cache::{EntityCache, KeyPattern, QueryKind};

/// User-triggered re-sync of every cached notification list.
#[derive(Clone)]
pub struct NotificationRefresher {
    cache: EntityCache,
    in_progress: Arc<AtomicUsize>,
}

/// Decrements the in-progress count when a refresh ends, even if cancelled.
struct InProgress(Arc<AtomicUsize>);

impl InProgress {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InProgress(counter.clone())
    }
}

impl Drop for InProgress {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl NotificationRefresher {
    pub fn new(cache: EntityCache) -> Self {
        Self {
            cache,
            in_progress: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// At least one refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst) > 0
    }

    /// Mark `[notifications]` stale and re-fetch it now. Returns how many
    /// entries were re-fetched.
    pub async fn refresh(&self) -> usize {
        let _guard = InProgress::enter(&self.in_progress);
        let pattern = KeyPattern::kind(QueryKind::Notifications);

        self.cache.invalidate(&pattern);
        let refetched = self.cache.refetch(&pattern).await;

        info!(refetched, "Notifications refreshed");
        refetched
    }
}
