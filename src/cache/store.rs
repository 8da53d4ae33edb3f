// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keyed store of fetched results with single-flight reads.
//!
//! ## Guarantees
//!
//! - At most one fetch per key is in flight. Readers arriving while a fetch
//!   is outstanding await the same result.
//! - A failed fetch stores the error and keeps the previous value.
//! - `invalidate` only marks entries stale; the next read re-fetches.
//! - `clear` drops every entry and bumps the generation. Fetches started
//!   under an older generation run to completion but their results are
//!   discarded.
//!
//! Fetches run on spawned tasks so a reader that stops waiting never leaves
//! an entry stuck in `Fetching`. Outstanding fetches are tracked apart from
//! the LRU entries, so evicting an entry never lets a second fetch for the
//! same key start.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::key::{CacheKey, KeyPattern};
use crate::error::ClientError;

/// Type-erased cached value.
type CachedValue = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<CachedValue, ClientError>;
type BoxFetch = Pin<Box<dyn Future<Output = FetchResult> + Send>>;
type Fetcher = Arc<dyn Fn() -> BoxFetch + Send + Sync>;
type InFlight = watch::Receiver<Option<FetchResult>>;

/// Default number of entries kept before least-recently-used eviction.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fetch lifecycle of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Fetching,
    Success,
    Error,
}

/// What a reader sees for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Last successfully fetched value, kept across later failures.
    pub data: Option<T>,
    pub status: FetchStatus,
    /// Fetching with no settled outcome yet.
    pub is_loading: bool,
    /// At least one fetch has settled (success or error).
    pub is_fetched: bool,
    pub is_stale: bool,
    pub error: Option<ClientError>,
}

impl<T> QueryState<T> {
    /// State of a disabled or absent read.
    pub fn idle() -> Self {
        Self {
            data: None,
            status: FetchStatus::Idle,
            is_loading: false,
            is_fetched: false,
            is_stale: false,
            error: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        QueryState {
            data: self.data.map(f),
            status: self.status,
            is_loading: self.is_loading,
            is_fetched: self.is_fetched,
            is_stale: self.is_stale,
            error: self.error,
        }
    }
}

struct CacheEntry {
    value: Option<CachedValue>,
    error: Option<ClientError>,
    status: FetchStatus,
    settled: bool,
    stale: bool,
    fetched_at: Option<Instant>,
    fetcher: Option<Fetcher>,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            value: None,
            error: None,
            status: FetchStatus::Idle,
            settled: false,
            stale: false,
            fetched_at: None,
            fetcher: None,
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        match (ttl, self.fetched_at) {
            (Some(ttl), Some(at)) => at.elapsed() >= ttl,
            _ => false,
        }
    }

    fn needs_fetch(&self, ttl: Option<Duration>) -> bool {
        !self.settled || self.stale || self.is_expired(ttl)
    }
}

/// A fetch that has been started and not yet applied.
///
/// Kept outside the LRU so evicting an entry never forgets its fetch.
struct Pending {
    rx: InFlight,
    token: u64,
    /// Invalidated while outstanding; the result is already out of date
    /// when it lands.
    invalidated: bool,
    fetcher: Fetcher,
}

impl Pending {
    /// The fetch task is still alive.
    fn is_live(&self) -> bool {
        self.rx.has_changed().is_ok()
    }
}

fn view<T: Clone + 'static>(
    entry: Option<&CacheEntry>,
    fetching: bool,
    ttl: Option<Duration>,
) -> QueryState<T> {
    let Some(entry) = entry else {
        let mut state = QueryState::idle();
        if fetching {
            state.status = FetchStatus::Fetching;
            state.is_loading = true;
        }
        return state;
    };

    QueryState {
        data: entry
            .value
            .as_ref()
            .and_then(|v| v.downcast_ref::<T>())
            .cloned(),
        status: if fetching {
            FetchStatus::Fetching
        } else {
            entry.status
        },
        is_loading: fetching && !entry.settled,
        is_fetched: entry.settled,
        is_stale: entry.stale || entry.is_expired(ttl),
        error: entry.error.clone(),
    }
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    pending: HashMap<CacheKey, Pending>,
    generation: u64,
    next_token: u64,
}

impl CacheState {
    fn live_pending(&self, key: &CacheKey) -> Option<&Pending> {
        self.pending.get(key).filter(|p| p.is_live())
    }
}

/// How `refetch` handles one matching key.
enum Refetch {
    Join(InFlight),
    /// Outstanding fetch was invalidated: let it finish, then fetch again.
    Restart(CacheKey, InFlight, Fetcher),
}

/// Shared handle to the entity cache.
///
/// Cloning is cheap; clones see the same entries.
#[derive(Clone)]
pub struct EntityCache {
    state: Arc<Mutex<CacheState>>,
    ttl: Option<Duration>,
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}

impl EntityCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// With a `ttl`, successful entries older than it count as stale; without
    /// one, entries only go stale through invalidation.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                pending: HashMap::new(),
                generation: 0,
                next_token: 0,
            })),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read `key`, fetching with `fetch_fn` when it is missing or stale.
    ///
    /// A disabled read returns [`QueryState::idle`] without touching the
    /// entry. Concurrent reads of one key share a single `fetch_fn` call.
    pub async fn read<T, F, Fut>(&self, key: CacheKey, fetch_fn: F, enabled: bool) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        if !enabled {
            return QueryState::idle();
        }

        let fetcher: Fetcher = Arc::new(move || {
            let fut = fetch_fn();
            Box::pin(async move { fut.await.map(|v| Arc::new(v) as CachedValue) })
        });

        let pending = {
            let mut state = self.lock();
            let ttl = self.ttl;

            if let Some(rx) = state.live_pending(&key).map(|p| p.rx.clone()) {
                if let Some(entry) = state.entries.get_mut(&key) {
                    entry.fetcher = Some(fetcher);
                }
                rx
            } else {
                // A pending record whose task died counts as unsettled.
                let abandoned = state.pending.remove(&key).is_some();
                let entry = state.entries.get_or_insert_mut(key.clone(), CacheEntry::new);
                entry.fetcher = Some(fetcher.clone());
                if abandoned || entry.needs_fetch(ttl) {
                    self.start_fetch(&mut state, &key, fetcher)
                } else {
                    return view(Some(&*entry), false, ttl);
                }
            }
        };

        wait(pending).await;
        self.snapshot(&key)
    }

    /// Current state of `key` without fetching.
    pub fn snapshot<T: Clone + 'static>(&self, key: &CacheKey) -> QueryState<T> {
        let state = self.lock();
        let fetching = state.live_pending(key).is_some();
        view(state.entries.peek(key), fetching, self.ttl)
    }

    /// Mark every entry matching `pattern` stale. Returns how many matched.
    pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut state = self.lock();
        let CacheState {
            entries, pending, ..
        } = &mut *state;

        let mut marked = 0;
        for (key, entry) in entries.iter_mut() {
            if pattern.matches(key) {
                entry.stale = true;
                marked += 1;
            }
        }
        for (key, fetch) in pending.iter_mut() {
            if pattern.matches(key) {
                fetch.invalidated = true;
                if !entries.contains(key) {
                    marked += 1;
                }
            }
        }
        debug!(pattern = %pattern, marked, "Cache entries invalidated");
        marked
    }

    /// Re-fetch every entry matching `pattern` now, whatever its freshness.
    ///
    /// An outstanding fetch is joined, unless it was invalidated after it
    /// started: then it is allowed to finish and a new fetch follows, so at
    /// most one fetch per key runs at a time. Entries that were never read
    /// have no fetch function and are skipped.
    pub async fn refetch(&self, pattern: &KeyPattern) -> usize {
        let plan: Vec<Refetch> = {
            let mut state = self.lock();

            let mut targets: Vec<(CacheKey, Fetcher)> = state
                .entries
                .iter()
                .filter(|(key, _)| pattern.matches(key))
                .filter_map(|(key, entry)| entry.fetcher.clone().map(|f| (key.clone(), f)))
                .collect();
            for (key, fetch) in state.pending.iter() {
                if pattern.matches(key) && !state.entries.contains(key) {
                    targets.push((key.clone(), fetch.fetcher.clone()));
                }
            }

            let mut plan = Vec::with_capacity(targets.len());
            for (key, fetcher) in targets {
                let live = state
                    .live_pending(&key)
                    .map(|p| (p.rx.clone(), p.invalidated));
                plan.push(match live {
                    Some((rx, true)) => Refetch::Restart(key, rx, fetcher),
                    Some((rx, false)) => Refetch::Join(rx),
                    None => {
                        state.pending.remove(&key);
                        Refetch::Join(self.start_fetch(&mut state, &key, fetcher))
                    }
                });
            }
            plan
        };

        let count = plan.len();
        for step in plan {
            match step {
                Refetch::Join(rx) => wait(rx).await,
                Refetch::Restart(key, rx, fetcher) => {
                    wait(rx).await;
                    if let Some(rx) = self.restart(&key, fetcher) {
                        wait(rx).await;
                    }
                }
            }
        }
        debug!(pattern = %pattern, count, "Cache entries refetched");
        count
    }

    /// Fetch `key` again after an invalidated fetch settled. Joins any fetch
    /// started in the meantime; does nothing if the entry was cleared.
    fn restart(&self, key: &CacheKey, fetcher: Fetcher) -> Option<InFlight> {
        let mut state = self.lock();
        if let Some(p) = state.live_pending(key) {
            return Some(p.rx.clone());
        }
        if !state.entries.contains(key) {
            return None;
        }
        state.pending.remove(key);
        Some(self.start_fetch(&mut state, key, fetcher))
    }

    /// Drop every entry. In-flight fetches complete but are not applied.
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.pending.clear();
        state.generation += 1;
        debug!(dropped, generation = state.generation, "Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains(key)
    }

    /// Spawn the fetch for `key` and record it as pending.
    fn start_fetch(&self, state: &mut CacheState, key: &CacheKey, fetcher: Fetcher) -> InFlight {
        let (tx, rx) = watch::channel(None);
        state.next_token += 1;
        let token = state.next_token;
        let generation = state.generation;

        state.pending.insert(
            key.clone(),
            Pending {
                rx: rx.clone(),
                token,
                invalidated: false,
                fetcher: fetcher.clone(),
            },
        );

        debug!(key = %key, token, "Cache fetch started");

        let cache = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let result = fetcher().await;
            cache.complete(&key, generation, token, &result);
            let _ = tx.send(Some(result));
        });

        rx
    }

    /// Apply a finished fetch unless the cache moved on without it.
    fn complete(&self, key: &CacheKey, generation: u64, token: u64, result: &FetchResult) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(key = %key, token, "Discarding fetch result from a cleared cache");
            return;
        }

        let invalidated = match state.pending.get(key) {
            Some(p) if p.token == token => p.invalidated,
            _ => {
                debug!(key = %key, token, "Discarding superseded fetch result");
                return;
            }
        };
        let fetcher = state.pending.remove(key).map(|p| p.fetcher);

        let entry = state.entries.get_or_insert_mut(key.clone(), CacheEntry::new);
        entry.settled = true;
        entry.stale = invalidated;
        if entry.fetcher.is_none() {
            entry.fetcher = fetcher;
        }

        match result {
            Ok(value) => {
                entry.value = Some(value.clone());
                entry.error = None;
                entry.status = FetchStatus::Success;
                entry.fetched_at = Some(Instant::now());
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Cache fetch failed");
                entry.error = Some(err.clone());
                entry.status = FetchStatus::Error;
            }
        }
    }
}

/// Wait for an in-flight fetch to publish. A dropped sender (aborted task)
/// counts as finished; the entry is re-fetched on the next read.
async fn wait(mut rx: InFlight) {
    let _ = rx.wait_for(Option::is_some).await;
}
