// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side cache of server-derived entities.
//!
//! - `key` - structured keys and prefix patterns
//! - `store` - the keyed store with single-flight reads
//! - `invalidation` - mutation → stale-key table

pub mod invalidation;
pub mod key;
pub mod store;

pub use invalidation::Mutation;
pub use key::{CacheKey, KeyPattern, QueryKind};
pub use store::{EntityCache, FetchStatus, QueryState};
