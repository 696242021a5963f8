//! The single-producer wrapper (spec §4.6): cache-lookup + producer-call +
//! background refresh for one request.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::cache::Cache;
use crate::collapse::Collapser;
use crate::diagnostics::{CacheOutcome, DiagnosticEvent, Diagnostics};
use crate::entry::Entry;
use crate::error::{ProducerFailure, WrapperError};
use crate::producer::Producer;
use crate::request::{CacheRequest, PartialRequest};
use crate::store::Store;

use super::{always_cacheable, split_producer_result, CacheReadFailurePolicy, IsCacheableFn};

/// Default collapsing window (spec §4.6: "default 3" seconds).
const DEFAULT_COLLAPSE_WINDOW: Duration = Duration::from_secs(3);

/// Construction-time configuration for a [`SingleProducerCache`].
#[derive(Clone)]
pub struct SingleWrapperOptions {
    /// Used in diagnostics events.
    pub cache_name: Option<String>,
    /// Sliding window within which identical producer calls are collapsed.
    pub collapse_overlapping_requests_time: Duration,
    /// What to do when a cache read fails.
    pub on_cache_read_failure: CacheReadFailurePolicy,
}

impl Default for SingleWrapperOptions {
    fn default() -> Self {
        Self {
            cache_name: None,
            collapse_overlapping_requests_time: DEFAULT_COLLAPSE_WINDOW,
            on_cache_read_failure: CacheReadFailurePolicy::default(),
        }
    }
}

type CollapsedResult<C> = Result<Entry<C>, ProducerFailure>;

/// Cache-lookup + producer-call + background refresh for one request at a
/// time (spec §4.6).
pub struct SingleProducerCache<C, S, P> {
    cache: Arc<Cache<C, S>>,
    producer: Arc<P>,
    options: SingleWrapperOptions,
    is_cacheable: IsCacheableFn,
    collapser: Collapser<String, CollapsedResult<C>>,
    diagnostics: Diagnostics,
}

impl<C, S, P> SingleProducerCache<C, S, P>
where
    C: Clone + Send + Sync + 'static,
    S: Store<C> + Send + Sync + 'static,
    P: Producer<C> + Send + Sync + 'static,
{
    /// Builds a wrapper with default options (always-cacheable, a 3s
    /// collapsing window, and `call-producer` on cache-read failure).
    pub fn new(cache: Arc<Cache<C, S>>, producer: P) -> Self {
        Self::with_options(cache, producer, SingleWrapperOptions::default())
    }

    /// Builds a wrapper with explicit options.
    pub fn with_options(cache: Arc<Cache<C, S>>, producer: P, options: SingleWrapperOptions) -> Self {
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

    /// Overrides the diagnostics channel, e.g. to share one across several
    /// wrappers.
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

    /// An uncacheable request bypasses the cache and the collapser entirely:
    /// neither stored nor deduplicated (spec §4.6 step 2).
    async fn call_producer_uncollapsed(&self, request: CacheRequest) -> Result<Entry<C>, WrapperError> {
        let now = SystemTime::now();
        let id = request.id.clone();
        let result = self.producer.produce(request).await?;
        let (entry, _resources) = split_producer_result(&self.cache, id, now, result);
        Ok(entry)
    }

    /// Resolves one request: a cache hit, a stale-while-revalidate entry,
    /// a stale-if-error fallback, or a fresh producer call, per the
    /// procedure in spec §4.6.
    pub async fn get(&self, request: impl Into<PartialRequest>) -> Result<Entry<C>, WrapperError> {
        let request = self.complete_request(request.into());

        if !(self.is_cacheable)(&request.id, &request.params) {
            self.publish(CacheOutcome::Uncacheable, &request.id);
            return self.call_producer_uncollapsed(request).await;
        }

        let lookup = match self.cache.get(&request).await {
            Ok(lookup) => lookup,
            Err(e) => match self.options.on_cache_read_failure {
                CacheReadFailurePolicy::Throw => return Err(e.into()),
                CacheReadFailurePolicy::CallProducer => Default::default(),
            },
        };

        if let Some(usable) = lookup.usable {
            self.publish(CacheOutcome::Hit, &request.id);
            return Ok(usable);
        }

        let key = super::key::single_key(&request.id, &request.params);
        let cache = Arc::clone(&self.cache);
        let producer = Arc::clone(&self.producer);
        let collapsed_request = request.clone();
        let handle = self.collapser.call(key, move || async move {
            let now = SystemTime::now();
            let id = collapsed_request.id.clone();
            let result = producer.produce(collapsed_request).await?;
            let (entry, resources) = split_producer_result(&cache, id, now, result);
            if let Err(e) = cache.store(resources).await {
                tracing::warn!(error = %e, "background cache store after producer call failed");
            }
            Ok(entry)
        });

        if let Some(swr) = lookup.usable_while_revalidate {
            self.publish(CacheOutcome::StaleWhileRevalidate, &request.id);
            let background = handle.clone();
            tokio::spawn(async move {
                if let Err(e) = background.await {
                    tracing::warn!(error = %e, "background stale-while-revalidate producer call failed");
                }
            });
            return Ok(swr);
        }

        if request.directives.max_age == Some(0.0) {
            self.publish(CacheOutcome::Bypass, &request.id);
        } else {
            self.publish(CacheOutcome::Miss, &request.id);
        }

        if let Some(uie) = lookup.usable_if_error {
            return match handle.await {
                Ok(entry) => Ok(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "producer failed, serving stale-if-error entry");
                    Ok(uie)
                }
            };
        }

        handle.await.map_err(WrapperError::from)
    }
}
