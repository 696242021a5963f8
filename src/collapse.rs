//! The request collapser (spec §4.5): deduplicates in-flight identical
//! producer calls within a sliding time window.
//!
//! `futures::future::Shared` is the direct analogue of "return a handle to
//! that call's future result": cloning it is cheap, every clone can be
//! awaited independently, dropping one clone never cancels the others, and
//! once the underlying future resolves every clone observes the identical
//! `Clone` output — which is exactly how a collapsed producer error must be
//! shared identically across joiners (spec §8 property 10).

use std::collections::hash_map::RandomState;
use std::future::Future;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

type SharedCall<T> = Shared<BoxFuture<'static, T>>;

struct PendingCall<T> {
    /// Monotonically increasing id, used to tell whether a cleanup timer
    /// still refers to the call it was scheduled for, or whether that slot
    /// has since been replaced by a fresh call under the same key.
    id: u64,
    started_at: Instant,
    call: SharedCall<T>,
}

/// Wraps an async function `f: K -> Fut<Output = T>` so that concurrent or
/// near-concurrent calls with the same key share one underlying
/// invocation.
///
/// The pending-call lifecycle follows the spec's own hint for its
/// ambiguity (spec §9, Open Questions): an entry is evicted at
/// `start + ttl`, not at completion. This means a call that finishes
/// quickly still dedupes late joiners who arrive before the window closes,
/// rather than only joiners who arrive before the call *finishes*.
pub struct Collapser<K, T> {
    ttl: Duration,
    pending: Arc<DashMap<K, PendingCall<T>>>,
    next_id: AtomicU64,
}

impl<K, T> Collapser<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Builds a collapser with the given sliding window.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, pending: Arc::new(DashMap::with_hasher(RandomState::new())), next_id: AtomicU64::new(0) }
    }

    /// Returns a handle to the (possibly shared) in-flight call for `key`,
    /// starting a fresh invocation of `f` if none is in flight within the
    /// TTL window. The caller decides whether to `.await` the handle
    /// inline, `.clone()` it to also run it in the background, etc. —
    /// cancelling one clone never cancels the underlying call.
    pub fn call<F, Fut>(&self, key: K, f: F) -> SharedCall<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        if let Some(existing) = self.pending.get(&key) {
            if existing.started_at.elapsed() < self.ttl {
                return existing.call.clone();
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let call: SharedCall<T> = f().boxed().shared();
        self.pending.insert(key.clone(), PendingCall { id, started_at: Instant::now(), call: call.clone() });

        let pending = Arc::clone(&self.pending);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            // Only remove the slot if it's still the call we scheduled this
            // cleanup for — a newer call may have replaced it since.
            let should_remove = pending.get(&key).map(|entry| entry.id == id).unwrap_or(false);
            if should_remove {
                pending.remove(&key);
            }
        });

        call
    }

    /// Number of keys with an in-flight (or not-yet-evicted) call. Exposed
    /// for tests and diagnostics.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
