// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory signing key cache.
//!
//! Keys are resolved by `kid`. A hit is served under a shared read lock. A
//! miss triggers one fetch from the [`KeySource`], merges the result and
//! re-checks; a kid that is still absent is an unknown key.
//!
//! ## Locking
//!
//! - The key map sits behind an `RwLock`; the write lock is held only for the
//!   in-memory merge, never across the network call, so hits are served while
//!   a fetch is in flight
//! - At most one fetch runs at a time. Callers that miss while it runs join it
//!   instead of starting their own or queueing behind it, so every caller
//!   waits for at most one time-bounded fetch
//!
//! ## Rotation
//!
//! Merges only add keys. A key the provider stops publishing stays trusted
//! until a wholesale [`replace_all`](KeyCache::replace_all), which the
//! optional periodic refresher performs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::jwks::{KeySet, KeySetError, KeySource, SigningKey};

type InFlightFetch = Shared<BoxFuture<'static, Result<Arc<KeySet>, KeySetError>>>;

/// Signing keys by kid, populated lazily from a [`KeySource`].
pub struct KeyCache {
    source: Arc<dyn KeySource>,
    keys: RwLock<KeySet>,
    /// Fetch currently running against the source, if any
    in_flight: Mutex<Option<InFlightFetch>>,
    fetch_count: AtomicU64,
}

impl KeyCache {
    /// Create an empty cache backed by `source`.
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            keys: RwLock::new(KeySet::new()),
            in_flight: Mutex::new(None),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Resolve a signing key by kid, refreshing once on a miss.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the refresh fails, or
    /// [`KeySetError::UnknownKeyId`] if the kid is absent after a successful
    /// refresh.
    pub async fn lookup(&self, kid: &str) -> Result<Arc<SigningKey>, KeySetError> {
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        debug!(kid = %kid, "Key not cached, refreshing key set");
        self.refresh().await?;

        self.cached(kid).await.ok_or_else(|| {
            warn!(kid = %kid, "Key not found in key set after refresh");
            KeySetError::UnknownKeyId(kid.to_string())
        })
    }

    async fn cached(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.read().await.get(kid).cloned()
    }

    /// Fetch the key set and merge it in. Existing keys are left as they are.
    ///
    /// Joins a fetch that is already running rather than starting another.
    /// Returns the number of keys that were new to the cache.
    pub async fn refresh(&self) -> Result<usize, KeySetError> {
        let fetched = self.fetch().await?;

        let mut keys = self.keys.write().await;
        let before = keys.len();
        for (kid, key) in fetched.iter() {
            keys.entry(kid.clone()).or_insert_with(|| key.clone());
        }
        let added = keys.len() - before;

        info!(added, key_count = keys.len(), "Signing key set merged");
        Ok(added)
    }

    /// Fetch the key set and replace the cached keys with it wholesale,
    /// dropping keys the provider no longer publishes.
    ///
    /// On fetch failure the cached keys are left untouched.
    pub async fn replace_all(&self) -> Result<usize, KeySetError> {
        let fetched = self.fetch().await?;

        let mut keys = self.keys.write().await;
        let evicted = keys.keys().filter(|kid| !fetched.contains_key(*kid)).count();
        *keys = KeySet::clone(&fetched);

        info!(key_count = keys.len(), evicted, "Signing key set replaced");
        Ok(keys.len())
    }

    /// Join the running fetch, or start one.
    async fn fetch(&self) -> Result<Arc<KeySet>, KeySetError> {
        let fetch = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.as_ref() {
                // A finished fetch left behind by a cancelled caller is stale
                Some(running) if running.peek().is_none() => {
                    debug!("Joining in-flight signing key set fetch");
                    running.clone()
                }
                _ => {
                    let started = self.start_fetch();
                    *in_flight = Some(started.clone());
                    started
                }
            }
        };

        let result = fetch.clone().await;

        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .as_ref()
            .is_some_and(|running| running.ptr_eq(&fetch))
        {
            *in_flight = None;
        }
        result
    }

    fn start_fetch(&self) -> InFlightFetch {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let source = self.source.clone();
        async move {
            source.fetch_keys().await.map(Arc::new).inspect_err(|e| {
                warn!(error = %e, "Signing key set fetch failed");
            })
        }
        .boxed()
        .shared()
    }

    /// Number of cached keys.
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }

    /// Number of fetches attempted since construction.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Replace the key set every `interval` until `shutdown` is cancelled.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(cache.clone().run_refresher(interval, shutdown.clone()));
    /// ```
    pub async fn run_refresher(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        info!(
            interval_secs = interval.as_secs(),
            "Periodic signing key refresh starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Periodic signing key refresh shutting down");
                    return;
                }
            }

            // Failure keeps the current keys; replace_all already logged it
            let _ = self.replace_all().await;
        }
    }
}
