//! The store contract (spec §4.3): an external collaborator the façade
//! consumes but never implements. Concrete backing stores (a memory LRU, a
//! SQL-backed store, etc.) are out of scope for this crate.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::entry::Entry;
use crate::error::StoreError;
use crate::param::Params;

/// Bounded concurrency used by the default [`Store::get_many`]
/// implementation.
const DEFAULT_GET_MANY_CONCURRENCY: usize = 16;

/// Abstract interface over a keyed entry store, as consumed by
/// [`crate::cache::Cache`]. The store's primary key is `(id, vary)`; at most
/// one entry exists per key (spec §3 invariant 1).
#[async_trait]
pub trait Store<C>: Send + Sync {
    /// Returns every entry for `id` whose stored vary is compatible with
    /// `params` (see [`crate::param::vary_matches`]).
    async fn get(&self, id: &str, params: &Params) -> Result<Vec<Entry<C>>, StoreError>;

    /// Batched form of [`Store::get`]. The default implementation calls
    /// `get` with bounded concurrency, preserving input order.
    async fn get_many(
        &self,
        requests: &[(String, Params)],
    ) -> Result<Vec<Vec<Entry<C>>>, StoreError> {
        stream::iter(requests)
            .map(|(id, params)| self.get(id, params))
            .buffered(DEFAULT_GET_MANY_CONCURRENCY)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    /// Upserts each entry keyed by `(entry.id, entry.vary)`. Within a single
    /// batch, if multiple inputs share a key, the store must keep the one
    /// with the latest `birthDate`. `max_store_for_seconds` is advisory —
    /// the store may evict earlier.
    async fn store(&self, entries: Vec<(Entry<C>, f64)>) -> Result<(), StoreError>;

    /// Removes every entry for `id`, across all vary keys.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Releases resources. `timeout` is advisory: the store decides whether
    /// to cancel pending I/O once it elapses.
    async fn close(&self, timeout: Option<Duration>) -> Result<(), StoreError>;
}
