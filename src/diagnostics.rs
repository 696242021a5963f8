//! The diagnostics channel (spec §6.3): a process-wide, synchronous
//! broadcast of outcome events, and the `"store"` event emitted by
//! [`crate::cache::Cache::store`] (spec §6.4).
//!
//! Diagnostics are deliberately separate from logging (`tracing`): logging
//! is for operators reading text; diagnostics are a typed feed a caller can
//! subscribe to and count, alert on, etc. Subscribers must be cheap — the
//! publish call runs synchronously on the publisher's task (spec §5).

use std::sync::{Arc, RwLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// The outcome of a single request handled by a producer wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CacheOutcome {
    /// Served directly from a usable cached entry.
    Hit,
    /// Served from a stale entry while revalidation runs in the background.
    StaleWhileRevalidate,
    /// The consumer asked to bypass the cache (`max-age: 0`-equivalent).
    Bypass,
    /// No usable or stale-while-revalidate entry was found.
    Miss,
    /// The request was not cacheable at all (`isCacheable` returned false).
    Uncacheable,
}

/// A single diagnostics message.
#[derive(Clone, Debug)]
pub struct DiagnosticEvent {
    /// Optional name of the cache instance that produced this event, for
    /// disambiguating diagnostics from multiple wrappers.
    pub cache_name: Option<String>,
    /// What happened.
    pub outcome: CacheOutcome,
    /// The request's `id`.
    pub cache_key: String,
}

/// A subscriber to the diagnostics channel. Cloning a `Diagnostics` shares
/// the same broadcast channel; every clone's subscribers receive every
/// published event.
#[derive(Clone)]
pub struct Diagnostics {
    sender: tokio::sync::broadcast::Sender<DiagnosticEvent>,
}

impl Diagnostics {
    /// Creates a new, empty diagnostics channel with the given backlog
    /// capacity (how many unconsumed events a lagging subscriber may miss
    /// before [`tokio::sync::broadcast`] starts dropping them).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to future events. Independent of any other subscriber.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DiagnosticEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event synchronously. A publish with no subscribers is
    /// not an error — it's simply dropped.
    pub fn publish(&self, event: DiagnosticEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Callback registered via [`crate::cache::Cache::on_store`], invoked once
/// per entry offered to `Cache::store`, before the store write resolves.
pub type StoreListener<C> = Arc<dyn Fn(&Entry<C>, f64) + Send + Sync>;

/// A synchronous listener registry for the `"store"` event.
pub struct StoreListeners<C> {
    listeners: RwLock<Vec<StoreListener<C>>>,
}

impl<C> StoreListeners<C> {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self { listeners: RwLock::new(Vec::new()) }
    }

    /// Registers a listener, to be fired after any already registered.
    pub fn add(&self, listener: StoreListener<C>) {
        self.listeners.write().unwrap_or_else(|e| e.into_inner()).push(listener);
    }

    /// Fires every registered listener for one entry, in registration order.
    pub fn fire(&self, entry: &Entry<C>, max_store_for_seconds: f64) {
        for listener in self.listeners.read().unwrap_or_else(|e| e.into_inner()).iter() {
            listener(entry, max_store_for_seconds);
        }
    }
}

impl<C> Default for StoreListeners<C> {
    fn default() -> Self {
        Self::new()
    }
}
