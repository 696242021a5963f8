//! The Cache façade (spec §4.4): queries a backing store, groups returned
//! entries by classification, and selects the best candidates for a
//! consumer request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::classify::{classify, Classification};
use crate::diagnostics::{StoreListener, StoreListeners};
use crate::entry::Entry;
use crate::error::CacheError;
use crate::param::{Normalizers, Params};
use crate::request::CacheRequest;
use crate::store::Store;

/// What to do when an operation is attempted after [`Cache::close`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Return [`CacheError::Closed`].
    Throw,
    /// Pretend the operation found/stored nothing.
    ReturnEmpty,
}

/// Construction-time policy knobs for a [`Cache`]. Named after the
/// teacher's own `CacheOptions` bundle-of-knobs convention.
#[derive(Clone, Copy, Debug)]
pub struct CacheOptions {
    /// Policy for `get`/`get_many` after `close()`.
    pub on_get_after_close: ClosePolicy,
    /// Policy for `store` after `close()`.
    pub on_store_after_close: ClosePolicy,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { on_get_after_close: ClosePolicy::Throw, on_store_after_close: ClosePolicy::Throw }
    }
}

/// A raw resource offered to [`Cache::store`], before defaults are filled
/// in (spec §4.4.4 step 3).
#[derive(Clone, Debug)]
pub struct RawResource<C> {
    /// Opaque identifier, part of the primary key.
    pub id: String,
    /// Vary mapping, pre-normalization. Defaults to empty.
    pub vary: crate::param::Vary,
    /// Opaque payload.
    pub content: C,
    /// Age, in seconds, at the moment of `date`. Defaults to `0`.
    pub initial_age: Option<f64>,
    /// Wall-clock instant this entry was produced/received. Defaults to
    /// `now` at the time `store()` is called.
    pub date: Option<SystemTime>,
    /// Normalized producer directives.
    pub directives: crate::directives::ProducerDirectives,
    /// Opaque validator mapping. Defaults to empty.
    pub validators: Option<crate::entry::Validators>,
}

/// The result of looking up entries for one request (spec §4.4.3).
///
/// Invariant: at most one of `usable`, (`usable_while_revalidate` or
/// `usable_if_error`) is populated — `usable` takes priority, then
/// `usable_while_revalidate`, then `usable_if_error` — mirroring
/// `processEntries`'s early returns.
#[derive(Clone, Debug, Default)]
pub struct LookupResult<C> {
    /// Best `Usable` entry, if any exists.
    pub usable: Option<Entry<C>>,
    /// Best `UsableWhileRevalidate` entry, if no `Usable` entry exists.
    pub usable_while_revalidate: Option<Entry<C>>,
    /// Best `UsableIfError` entry, if no `Usable`/`UsableWhileRevalidate`
    /// entry exists.
    pub usable_if_error: Option<Entry<C>>,
    /// Every validatable entry considered, when no `Usable` entry exists.
    pub validatable: Vec<Entry<C>>,
}

/// Picks the entry with the greatest `birthDate` from an iterator. Ties
/// are broken deterministically: the last entry in input order wins.
fn best<C>(entries: impl IntoIterator<Item = Entry<C>>) -> Option<Entry<C>> {
    entries.into_iter().fold(None, |champion, candidate| match &champion {
        Some(current) if current.birth_date() > candidate.birth_date() => champion,
        _ => Some(candidate),
    })
}

/// Groups `entries` by classification and selects the best candidates
/// (spec §4.4.3, `processEntries`).
pub fn process_entries<C: Clone>(
    entries: Vec<Entry<C>>,
    directives: &crate::directives::ConsumerDirectives,
    now: SystemTime,
) -> LookupResult<C> {
    let mut usable = Vec::new();
    let mut usable_while_revalidate = Vec::new();
    let mut usable_if_error = Vec::new();

    for entry in &entries {
        match classify(entry, directives, now) {
            Classification::Usable => usable.push(entry.clone()),
            Classification::UsableWhileRevalidate => usable_while_revalidate.push(entry.clone()),
            Classification::UsableIfError => usable_if_error.push(entry.clone()),
            Classification::Unusable => {}
        }
    }

    if !usable.is_empty() {
        return LookupResult { usable: best(usable), ..Default::default() };
    }

    // Spec §4.4.3: `validatable` ranges over every entry the store returned,
    // not just the UWR/UIE buckets — an otherwise-Unusable entry (e.g. past
    // even its `ifError` tolerance) still counts if it carries validators.
    let validatable: Vec<Entry<C>> = entries.into_iter().filter(|e| e.is_validatable()).collect();

    if !usable_while_revalidate.is_empty() {
        return LookupResult {
            usable_while_revalidate: best(usable_while_revalidate),
            validatable,
            ..Default::default()
        };
    }

    LookupResult { usable_if_error: best(usable_if_error), validatable, ..Default::default() }
}

/// `potentiallyUsefulFor(e, now)` plus the producer's requested
/// `storeFor`, clamped to non-negative (spec §4.4.4 step 3).
pub fn calculate_store_for<C>(entry: &Entry<C>, now: SystemTime) -> f64 {
    let requested_store_for = match entry.directives.store_for {
        Some(store_for) => store_for - entry.initial_age,
        None => f64::INFINITY,
    };
    requested_store_for.min(entry.potentially_useful_for(now)).max(0.0)
}

/// The Cache façade: `get`, `get_many`, `store`, `delete`, `close`.
pub struct Cache<C, S> {
    store: Arc<S>,
    closed: AtomicBool,
    options: CacheOptions,
    normalizers: Normalizers,
    listeners: StoreListeners<C>,
}

impl<C, S> Cache<C, S>
where
    C: Clone + Send + Sync + 'static,
    S: Store<C>,
{
    /// Builds a façade over `store` with default options and identity
    /// normalizers.
    pub fn new(store: S) -> Self {
        Self::with_options(store, CacheOptions::default(), Normalizers::default())
    }

    /// Builds a façade with explicit close policies and param normalizers.
    pub fn with_options(store: S, options: CacheOptions, normalizers: Normalizers) -> Self {
        Self {
            store: Arc::new(store),
            closed: AtomicBool::new(false),
            options,
            normalizers,
            listeners: StoreListeners::new(),
        }
    }

    /// Registers a listener invoked once per entry offered to
    /// [`Cache::store`], before the underlying store write begins.
    pub fn on_store(&self, listener: StoreListener<C>) {
        self.listeners.add(listener);
    }

    /// Applies the configured name/value normalizers to a vary mapping.
    /// Exposed so wrappers can normalize an uncacheable producer result's
    /// vary without going through `store()` (spec §4.6 step 2).
    pub fn normalize_vary(&self, vary: &crate::param::Vary) -> crate::param::Vary {
        self.normalizers.normalize_vary(vary)
    }

    /// Applies the configured name/value normalizers to raw request params.
    /// Exposed so wrappers can complete a [`PartialRequest`](crate::request::PartialRequest)
    /// before consulting the cache (spec §4.6 step 1 / §4.7 step 1).
    pub fn normalize_params(&self, raw: &crate::param::RawParams) -> Params {
        self.normalizers.normalize_params(raw)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Looks up entries for one request.
    pub async fn get(&self, request: &CacheRequest) -> Result<LookupResult<C>, CacheError> {
        if self.is_closed() {
            return match self.options.on_get_after_close {
                ClosePolicy::Throw => Err(CacheError::Closed),
                ClosePolicy::ReturnEmpty => Ok(LookupResult::default()),
            };
        }

        let now = SystemTime::now();
        let entries = self.store.get(&request.id, &request.params).await?;
        Ok(process_entries(entries, &request.directives, now))
    }

    /// Batched form of [`Cache::get`]. A single `now` is captured before
    /// the store call so classification is consistent across the batch;
    /// result order matches input order.
    pub async fn get_many(
        &self,
        requests: &[CacheRequest],
    ) -> Result<Vec<LookupResult<C>>, CacheError> {
        if self.is_closed() {
            return match self.options.on_get_after_close {
                ClosePolicy::Throw => Err(CacheError::Closed),
                ClosePolicy::ReturnEmpty => {
                    Ok(requests.iter().map(|_| LookupResult::default()).collect())
                }
            };
        }

        let now = SystemTime::now();
        let store_requests: Vec<(String, Params)> =
            requests.iter().map(|r| (r.id.clone(), r.params.clone())).collect();
        let grouped = self.store.get_many(&store_requests).await?;

        Ok(grouped
            .into_iter()
            .zip(requests.iter())
            .map(|(entries, request)| process_entries(entries, &request.directives, now))
            .collect())
    }

    /// Normalizes, stores, and emits a `"store"` event for each resource.
    pub async fn store(&self, resources: Vec<RawResource<C>>) -> Result<(), CacheError> {
        if self.is_closed() {
            return match self.options.on_store_after_close {
                ClosePolicy::Throw => Err(CacheError::Closed),
                ClosePolicy::ReturnEmpty => Ok(()),
            };
        }

        let now = SystemTime::now();
        let mut to_store = Vec::with_capacity(resources.len());

        for raw in resources {
            let entry = Entry {
                id: raw.id,
                vary: self.normalizers.normalize_vary(&raw.vary),
                content: raw.content,
                initial_age: raw.initial_age.unwrap_or(0.0).max(0.0),
                date: raw.date.unwrap_or(now),
                directives: raw.directives,
                validators: raw.validators.unwrap_or_default(),
            };
            let max_store_for_seconds = calculate_store_for(&entry, now);
            self.listeners.fire(&entry, max_store_for_seconds);
            to_store.push((entry, max_store_for_seconds));
        }

        self.store.store(to_store).await?;
        Ok(())
    }

    /// Removes every entry for `id`.
    pub async fn delete(&self, id: &str) -> Result<(), CacheError> {
        if self.is_closed() {
            return match self.options.on_store_after_close {
                ClosePolicy::Throw => Err(CacheError::Closed),
                ClosePolicy::ReturnEmpty => Ok(()),
            };
        }
        self.store.delete(id).await?;
        Ok(())
    }

    /// Marks the cache closed and forwards to the store. Idempotent.
    pub async fn close(&self, timeout: Option<Duration>) -> Result<(), CacheError> {
        self.closed.store(true, Ordering::Release);
        self.store.close(timeout).await?;
        Ok(())
    }
}
