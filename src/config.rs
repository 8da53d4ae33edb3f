// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once, at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CLINIC_API_URL` | Base URL of the remote clinic API | `http://127.0.0.1:8080` |
//! | `CLINIC_ID_TOKEN` | Bearer token used to sign in | unset |
//! | `CLINIC_CACHE_CAPACITY` | Maximum cached entries before LRU eviction | `256` |
//! | `CLINIC_CACHE_TTL_SECS` | Age at which a cached entry goes stale (`0` disables) | `0` |
//! | `CLINIC_REQUEST_TIMEOUT_SECS` | HTTP request timeout | `15` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |
//!
//! Malformed values fall back to the default with a warning.

use std::time::Duration;

use tracing::warn;

use crate::cache::store::DEFAULT_CAPACITY;
use crate::logging::LogFormat;

pub const API_URL_ENV: &str = "CLINIC_API_URL";
pub const ID_TOKEN_ENV: &str = "CLINIC_ID_TOKEN";
pub const CACHE_CAPACITY_ENV: &str = "CLINIC_CACHE_CAPACITY";
pub const CACHE_TTL_ENV: &str = "CLINIC_CACHE_TTL_SECS";
pub const REQUEST_TIMEOUT_ENV: &str = "CLINIC_REQUEST_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Settings for one client process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub id_token: Option<String>,
    pub cache_capacity: usize,
    /// `None` means entries only go stale through invalidation.
    pub cache_ttl: Option<Duration>,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            id_token: None,
            cache_capacity: DEFAULT_CAPACITY,
            cache_ttl: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let cache_capacity = parse_or(CACHE_CAPACITY_ENV, var(CACHE_CAPACITY_ENV), defaults.cache_capacity)
            .max(1);
        let ttl_secs: u64 = parse_or(CACHE_TTL_ENV, var(CACHE_TTL_ENV), 0);
        let timeout_secs = parse_or(
            REQUEST_TIMEOUT_ENV,
            var(REQUEST_TIMEOUT_ENV),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        );

        let log_format = match var(LOG_FORMAT_ENV) {
            None => defaults.log_format,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(variable = LOG_FORMAT_ENV, value = %raw, "Unknown log format, using pretty");
                defaults.log_format
            }),
        };

        Self {
            api_url: var(API_URL_ENV).unwrap_or(defaults.api_url),
            id_token: var(ID_TOKEN_ENV),
            cache_capacity,
            cache_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            request_timeout: Duration::from_secs(timeout_secs),
            log_format,
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Malformed value, using default");
            default
        }),
    }
}
