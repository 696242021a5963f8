//! The bulk-producer wrapper (spec §4.7): the same cache-lookup and
//! stale-while-revalidate/stale-if-error machinery as
//! [`SingleProducerCache`](super::SingleProducerCache), batched across many
//! requests in one call.

use std::sync::Arc;
use std::time::SystemTime;

use crate::cache::Cache;
use crate::collapse::Collapser;
use crate::diagnostics::{CacheOutcome, DiagnosticEvent, Diagnostics};
use crate::entry::Entry;
use crate::error::{ProducerFailure, WrapperError};
use crate::producer::BulkProducer;
use crate::request::{CacheRequest, PartialRequest};
use crate::store::Store;

use super::single::SingleWrapperOptions as BulkWrapperOptions;
use super::{always_cacheable, split_producer_result, CacheReadFailurePolicy, IsCacheableFn};

type CollapsedResult<C> = Result<Entry<C>, ProducerFailure>;
type BatchHandle<C> = futures::future::Shared<futures::future::BoxFuture<'static, Vec<CollapsedResult<C>>>>;

/// Calls `producer.produce_many(requests)`, splits each success into an
/// entry plus its resources to store, and stores every resource from the
/// whole batch in one call. Shared by the synchronous and background
/// (stale-while-revalidate) batched call paths.
async fn call_producer_batch<C, S, P>(
    cache: Arc<Cache<C, S>>,
    producer: Arc<P>,
    requests: Vec<CacheRequest>,
) -> Vec<CollapsedResult<C>>
where
    C: Clone + Send + Sync + 'static,
    S: Store<C> + Send + Sync + 'static,
    P: BulkProducer<C> + Send + Sync + 'static,
{
    let now = SystemTime::now();
    let ids: Vec<String> = requests.iter().map(|r| r.id.clone()).collect();
    let results = producer.produce_many(requests).await;

    let mut resources_to_store = Vec::new();
    let mut out = Vec::with_capacity(results.len());
    for (id, result) in ids.into_iter().zip(results) {
        match result {
            Ok(result) => {
                let (entry, mut resources) = split_producer_result(&cache, id, now, result);
                resources_to_store.append(&mut resources);
                out.push(Ok(entry));
            }
            Err(e) => out.push(Err(e)),
        }
    }

    if !resources_to_store.is_empty() {
        if let Err(e) = cache.store(resources_to_store).await {
            tracing::warn!(error = %e, "background cache store after bulk producer call failed");
        }
    }
    out
}

/// Batched cache-lookup + producer-call + background refresh (spec §4.7).
pub struct BulkProducerCache<C, S, P> {
    cache: Arc<Cache<C, S>>,
    producer: Arc<P>,
    options: BulkWrapperOptions,
    is_cacheable: IsCacheableFn,
    collapser: Collapser<String, Vec<CollapsedResult<C>>>,
    diagnostics: Diagnostics,
}

impl<C, S, P> BulkProducerCache<C, S, P>
where
    C: Clone + Send + Sync + 'static,
    S: Store<C> + Send + Sync + 'static,
    P: BulkProducer<C> + Send + Sync + 'static,
{
    /// Builds a wrapper with default options.
    pub fn new(cache: Arc<Cache<C, S>>, producer: P) -> Self {
        Self::with_options(cache, producer, BulkWrapperOptions::default())
    }

    /// Builds a wrapper with explicit options.
    pub fn with_options(cache: Arc<Cache<C, S>>, producer: P, options: BulkWrapperOptions) -> Self {
        let collapser = Collapser::new(options.collapse_overlapping_requests_time);
        Self {
            cache,
            producer: Arc::new(producer),
            options,
            is_cacheable: always_cacheable(),
            collapser,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Overrides the `isCacheable` predicate (default: always true).
    pub fn with_is_cacheable(mut self, predicate: IsCacheableFn) -> Self {
        self.is_cacheable = predicate;
        self
    }

    /// Overrides the diagnostics channel.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Subscribes to this wrapper's diagnostics outcome feed.
    pub fn subscribe_diagnostics(&self) -> tokio::sync::broadcast::Receiver<DiagnosticEvent> {
        self.diagnostics.subscribe()
    }

    fn publish(&self, outcome: CacheOutcome, cache_key: &str) {
        self.diagnostics.publish(DiagnosticEvent {
            cache_name: self.options.cache_name.clone(),
            outcome,
            cache_key: cache_key.to_owned(),
        });
    }

    fn complete_request(&self, request: PartialRequest) -> CacheRequest {
        CacheRequest {
            id: request.id,
            params: request
                .params
                .map(|raw| self.cache.normalize_params(&raw))
                .unwrap_or_default(),
            directives: request.directives.unwrap_or_default(),
        }
    }

    /// Spawns `requests` as one collapsed batched producer call and returns
    /// a handle to it, keyed so that an identical concurrent bulk call
    /// shares the same underlying invocation (spec §4.5, extended to
    /// batches).
    fn collapsed_batch_call(&self, requests: Vec<CacheRequest>) -> BatchHandle<C> {
        let key = super::key::batch_key(requests.iter().map(|r| (r.id.as_str(), &r.params)));
        let cache = Arc::clone(&self.cache);
        let producer = Arc::clone(&self.producer);
        self.collapser.call(key, move || call_producer_batch(cache, producer, requests))
    }

    /// Resolves every request in `requests`, preserving input order. Each
    /// slot independently reflects a hit, a stale-while-revalidate entry, a
    /// stale-if-error fallback, or a producer result/failure.
    pub async fn get_many(
        &self,
        requests: Vec<impl Into<PartialRequest>>,
    ) -> Vec<Result<Entry<C>, WrapperError>> {
        let requests: Vec<CacheRequest> =
            requests.into_iter().map(|r| self.complete_request(r.into())).collect();

        let mut cacheable_idx = Vec::new();
        let mut uncacheable_idx = Vec::new();
        for (i, request) in requests.iter().enumerate() {
            if (self.is_cacheable)(&request.id, &request.params) {
                cacheable_idx.push(i);
            } else {
                uncacheable_idx.push(i);
            }
        }

        let uncacheable_requests: Vec<CacheRequest> =
            uncacheable_idx.iter().map(|&i| requests[i].clone()).collect();
        let cacheable_requests: Vec<CacheRequest> =
            cacheable_idx.iter().map(|&i| requests[i].clone()).collect();

        let (uncacheable_results, cacheable_lookups) = tokio::join!(
            self.produce_uncacheable(uncacheable_requests),
            self.lookup_cacheable(cacheable_requests),
        );

        let mut out: Vec<Option<Result<Entry<C>, WrapperError>>> = (0..requests.len()).map(|_| None).collect();
        for (&i, result) in uncacheable_idx.iter().zip(uncacheable_results) {
            self.publish(CacheOutcome::Uncacheable, &requests[i].id);
            out[i] = Some(result);
        }

        let cacheable_lookups = match cacheable_lookups {
            Ok(lookups) => lookups,
            Err(err) => {
                let shared = Arc::new(err);
                for &i in &cacheable_idx {
                    out[i] = Some(Err(WrapperError::CacheRead(Arc::clone(&shared))));
                }
                return out.into_iter().map(|slot| slot.expect("every index filled")).collect();
            }
        };

        let mut sync_requests = Vec::new();
        let mut sync_idx = Vec::new();
        let mut sync_uie = Vec::new();
        let mut swr_requests = Vec::new();

        for (&i, lookup) in cacheable_idx.iter().zip(cacheable_lookups) {
            if let Some(usable) = lookup.usable {
                self.publish(CacheOutcome::Hit, &requests[i].id);
                out[i] = Some(Ok(usable));
                continue;
            }
            if let Some(swr) = lookup.usable_while_revalidate {
                self.publish(CacheOutcome::StaleWhileRevalidate, &requests[i].id);
                out[i] = Some(Ok(swr));
                swr_requests.push(requests[i].clone());
                continue;
            }

            if requests[i].directives.max_age == Some(0.0) {
                self.publish(CacheOutcome::Bypass, &requests[i].id);
            } else {
                self.publish(CacheOutcome::Miss, &requests[i].id);
            }
            sync_requests.push(requests[i].clone());
            sync_idx.push(i);
            sync_uie.push(lookup.usable_if_error);
        }

        if !swr_requests.is_empty() {
            let handle = self.collapsed_batch_call(swr_requests);
            tokio::spawn(async move {
                for result in handle.await {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "background stale-while-revalidate bulk producer call failed");
                    }
                }
            });
        }

        if !sync_requests.is_empty() {
            let handle = self.collapsed_batch_call(sync_requests);
            let results = handle.await;
            for ((i, uie), result) in sync_idx.into_iter().zip(sync_uie).zip(results) {
                out[i] = Some(match (result, uie) {
                    (Ok(entry), _) => Ok(entry),
                    (Err(e), Some(uie)) => {
                        tracing::warn!(error = %e, "producer failed, serving stale-if-error entry");
                        Ok(uie)
                    }
                    (Err(e), None) => Err(WrapperError::from(e)),
                });
            }
        }

        out.into_iter().map(|slot| slot.expect("every index filled")).collect()
    }

    async fn produce_uncacheable(&self, requests: Vec<CacheRequest>) -> Vec<Result<Entry<C>, WrapperError>> {
        if requests.is_empty() {
            return Vec::new();
        }
        let now = SystemTime::now();
        let ids: Vec<String> = requests.iter().map(|r| r.id.clone()).collect();
        let results = self.producer.produce_many(requests).await;
        ids.into_iter()
            .zip(results)
            .map(|(id, result)| match result {
                Ok(result) => {
                    let (entry, _resources) = split_producer_result(&self.cache, id, now, result);
                    Ok(entry)
                }
                Err(e) => Err(WrapperError::from(e)),
            })
            .collect()
    }

    async fn lookup_cacheable(
        &self,
        requests: Vec<CacheRequest>,
    ) -> Result<Vec<crate::cache::LookupResult<C>>, crate::error::CacheError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        match self.cache.get_many(&requests).await {
            Ok(lookups) => Ok(lookups),
            Err(e) => match self.options.on_cache_read_failure {
                CacheReadFailurePolicy::Throw => Err(e),
                CacheReadFailurePolicy::CallProducer => {
                    Ok(requests.iter().map(|_| crate::cache::LookupResult::default()).collect())
                }
            },
        }
    }
}
