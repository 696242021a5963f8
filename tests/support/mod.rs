//! Test doubles shared across the integration suites: an in-memory
//! [`Store`], and fixed-script [`Producer`]/[`BulkProducer`] stand-ins.
//! None of this is part of the public API — concrete stores are out of
//! scope for the crate itself (spec §4.3).

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use content_cache::param::{vary_matches, Params};
use content_cache::{Entry, ProducerFailure, ProducerResult, Store, StoreError};

/// An in-memory store keyed by `id`, holding at most one entry per
/// `(id, vary)` pair as the store contract requires.
#[derive(Default)]
pub struct MemoryStore<C> {
    entries: Mutex<Vec<Entry<C>>>,
}

impl<C: Clone> MemoryStore<C> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl<C: Clone + Send + Sync> Store<C> for MemoryStore<C> {
    async fn get(&self, id: &str, params: &Params) -> Result<Vec<Entry<C>>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.id == id && vary_matches(&e.vary, params))
            .cloned()
            .collect())
    }

    async fn store(&self, new_entries: Vec<(Entry<C>, f64)>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        for (entry, _max_store_for_seconds) in new_entries {
            entries.retain(|e| !(e.id == entry.id && e.vary == entry.vary));
            entries.push(entry);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    }

    async fn close(&self, _timeout: Option<Duration>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A store whose `get`/`get_many` always fails, for exercising
/// `on_cache_read_failure` policies.
pub struct FailingStore;

#[async_trait]
impl<C: Clone + Send + Sync> Store<C> for FailingStore {
    async fn get(&self, _id: &str, _params: &Params) -> Result<Vec<Entry<C>>, StoreError> {
        Err(StoreError::Read("simulated read failure".into()))
    }

    async fn store(&self, _entries: Vec<(Entry<C>, f64)>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self, _timeout: Option<Duration>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct StringError(pub String);

impl std::fmt::Display for StringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StringError {}

/// A producer that replays a fixed script of results, one per call, then
/// repeats its last entry forever. Counts how many times it was called.
pub struct ScriptedProducer<C> {
    script: Mutex<Vec<Result<ProducerResult<C>, String>>>,
    calls: AtomicUsize,
}

impl<C: Clone> ScriptedProducer<C> {
    pub fn new(script: Vec<Result<ProducerResult<C>, String>>) -> Self {
        Self { script: Mutex::new(script), calls: AtomicUsize::new(0) }
    }

    pub fn always_fail() -> Self {
        Self::new(vec![])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: Clone + Send + Sync> content_cache::Producer<C> for ScriptedProducer<C> {
    async fn produce(
        &self,
        _request: content_cache::CacheRequest,
    ) -> Result<ProducerResult<C>, ProducerFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(ProducerFailure::new(StringError(format!("producer exhausted at call {call}"))));
        }
        let idx = call.min(script.len() - 1);
        match script[idx].clone() {
            Ok(result) => Ok(result),
            Err(msg) => Err(ProducerFailure::new(StringError(msg))),
        }
    }
}

/// A bulk producer that always fails every element, for stale-if-error
/// bulk scenarios.
pub struct AlwaysFailingBulkProducer;

#[async_trait]
impl<C: Clone + Send + Sync> content_cache::BulkProducer<C> for AlwaysFailingBulkProducer {
    async fn produce_many(
        &self,
        requests: Vec<content_cache::CacheRequest>,
    ) -> Vec<Result<ProducerResult<C>, ProducerFailure>> {
        requests
            .iter()
            .map(|_| Err(ProducerFailure::new(StringError("simulated producer failure".into()))))
            .collect()
    }
}

/// A bulk producer that succeeds for every element, returning `content`
/// built from the request's `id`, and counts how many batched calls it
/// received.
pub struct EchoBulkProducer {
    fresh_until_age: f64,
    calls: AtomicUsize,
}

impl EchoBulkProducer {
    pub fn new(fresh_until_age: f64) -> Self {
        Self { fresh_until_age, calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl content_cache::BulkProducer<String> for EchoBulkProducer {
    async fn produce_many(
        &self,
        requests: Vec<content_cache::CacheRequest>,
    ) -> Vec<Result<ProducerResult<String>, ProducerFailure>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        requests
            .iter()
            .map(|r| {
                Ok(ProducerResult {
                    vary: Default::default(),
                    content: format!("produced:{}", r.id),
                    directives: content_cache::directives::RawProducerDirectives {
                        fresh_until_age: self.fresh_until_age,
                        max_stale: None,
                        store_for: None,
                    }
                    .normalize(),
                    validators: None,
                    supplemental_resources: Vec::new(),
                })
            })
            .collect()
    }
}

/// Builds a `RawResource` for a plain `String` payload with the given
/// freshness/staleness directives and no vary/validators, freshly born
/// (`initial_age: 0`).
pub fn raw_resource(
    id: &str,
    fresh_until_age: f64,
    max_stale: Option<(f64, f64, f64)>,
) -> content_cache::cache::RawResource<String> {
    raw_resource_aged(id, fresh_until_age, max_stale, 0.0)
}

/// Same as [`raw_resource`], but already `initial_age` seconds old the
/// instant it's stored — used to simulate "stored, then N ms elapsed"
/// without depending on `SystemTime::now()` advancing with tokio's mocked
/// clock (it doesn't: only `tokio::time` types are paused/advanced).
pub fn raw_resource_aged(
    id: &str,
    fresh_until_age: f64,
    max_stale: Option<(f64, f64, f64)>,
    initial_age: f64,
) -> content_cache::cache::RawResource<String> {
    let max_stale = max_stale.map(|(w, r, e)| content_cache::directives::RawMaxStale {
        without_revalidation: w,
        while_revalidate: r,
        if_error: e,
    });
    content_cache::cache::RawResource {
        id: id.to_owned(),
        vary: Default::default(),
        content: format!("content:{id}"),
        initial_age: Some(initial_age),
        date: None,
        directives: content_cache::directives::RawProducerDirectives { fresh_until_age, max_stale, store_for: None }
            .normalize(),
        validators: None,
    }
}
