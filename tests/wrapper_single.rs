//! Integration tests for `SingleProducerCache` (spec §4.6, §8 scenarios D
//! and E): stale-while-revalidate, stale-if-error, request collapsing, and
//! the uncacheable bypass path.
//!
//! These use real (unpaused) sleeps rather than `tokio::time::advance`:
//! entry freshness is computed from `SystemTime::now()`, which a paused
//! tokio clock does not advance.

mod support;

use std::sync::Arc;
use std::time::Duration;

use content_cache::directives::{RawMaxStale, RawProducerDirectives};
use content_cache::param::Params;
use content_cache::wrapper::single::SingleWrapperOptions;
use content_cache::{Cache, ProducerResult, SingleProducerCache, WrapperError};
use support::{MemoryStore, ScriptedProducer};

fn producer_result(content: &str, fresh_until_age: f64, max_stale: Option<(f64, f64, f64)>) -> ProducerResult<String> {
    let max_stale = max_stale.map(|(w, r, e)| RawMaxStale { without_revalidation: w, while_revalidate: r, if_error: e });
    ProducerResult {
        vary: Default::default(),
        content: content.to_owned(),
        directives: RawProducerDirectives { fresh_until_age, max_stale, store_for: None }.normalize(),
        validators: None,
        supplemental_resources: Vec::new(),
    }
}

fn short_collapse_options() -> SingleWrapperOptions {
    SingleWrapperOptions { collapse_overlapping_requests_time: Duration::from_millis(20), ..Default::default() }
}

#[tokio::test]
async fn scenario_d_stale_while_revalidate_then_fresh_after_background_refresh() {
    let cache = Arc::new(Cache::new(MemoryStore::new()));
    let producer = ScriptedProducer::new(vec![
        Ok(producer_result("v1", 0.05, Some((0.0, 0.3, 0.3)))),
        Ok(producer_result("v2", 0.05, Some((0.0, 0.3, 0.3)))),
    ]);
    let wrapper = SingleProducerCache::with_options(Arc::clone(&cache), producer, short_collapse_options());

    let first = wrapper.get("d").await.unwrap();
    assert_eq!(first.content, "v1");

    tokio::time::sleep(Duration::from_millis(120)).await;

    let second = wrapper.get("d").await.unwrap();
    assert_eq!(second.content, "v1", "stale entry should be served while revalidation runs");

    // Give the detached background revalidation time to complete and store.
    tokio::time::sleep(Duration::from_millis(80)).await;

    let third = wrapper.get("d").await.unwrap();
    assert_eq!(third.content, "v2");
}

#[tokio::test]
async fn scenario_e_stale_if_error_then_surfaces_failure_once_past_tolerance() {
    let cache = Arc::new(Cache::new(MemoryStore::new()));
    let producer = ScriptedProducer::new(vec![
        Ok(producer_result("cached", 0.05, Some((0.0, 0.0, 0.15)))),
        Err("origin down".to_owned()),
        Err("origin down".to_owned()),
    ]);
    let wrapper = SingleProducerCache::with_options(Arc::clone(&cache), producer, short_collapse_options());

    let first = wrapper.get("e").await.unwrap();
    assert_eq!(first.content, "cached");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = wrapper.get("e").await.unwrap();
    assert_eq!(second.content, "cached", "stale-if-error should substitute the cached entry");

    tokio::time::sleep(Duration::from_millis(120)).await;

    let third = wrapper.get("e").await;
    assert!(matches!(third, Err(WrapperError::Producer(_))), "past stale-if-error tolerance, the failure must surface");
}

#[tokio::test]
async fn uncacheable_request_bypasses_cache_and_collapsing() {
    let cache = Arc::new(Cache::new(MemoryStore::new()));
    let producer = ScriptedProducer::new(vec![Ok(producer_result("v", 10.0, None))]);
    let wrapper = SingleProducerCache::new(Arc::clone(&cache), producer)
        .with_is_cacheable(Arc::new(|_id: &str, _params: &Params| false));

    let result = wrapper.get("u").await.unwrap();
    assert_eq!(result.content, "v");

    // Never stored: a direct cache lookup still finds nothing.
    let request = content_cache::CacheRequest { id: "u".into(), ..Default::default() };
    let lookup = cache.get(&request).await.unwrap();
    assert!(lookup.usable.is_none());
}

#[tokio::test]
async fn concurrent_misses_for_the_same_request_collapse_to_one_producer_call() {
    let cache = Arc::new(Cache::new(MemoryStore::new()));
    let producer = Arc::new(ScriptedProducer::new(vec![Ok(producer_result("v", 10.0, None))]));
    let wrapper = Arc::new(SingleProducerCache::new(Arc::clone(&cache), ConcurrentProducerHandle(Arc::clone(&producer))));

    let a = wrapper.get("concurrent");
    let b = wrapper.get("concurrent");
    let (ra, rb) = tokio::join!(a, b);
    assert_eq!(ra.unwrap().content, "v");
    assert_eq!(rb.unwrap().content, "v");
    assert_eq!(producer.call_count(), 1);
}

/// Wraps a `ScriptedProducer` so it can be shared by reference while still
/// satisfying `Producer`'s by-value construction in `SingleProducerCache`.
struct ConcurrentProducerHandle(Arc<ScriptedProducer<String>>);

#[async_trait::async_trait]
impl content_cache::Producer<String> for ConcurrentProducerHandle {
    async fn produce(
        &self,
        request: content_cache::CacheRequest,
    ) -> Result<ProducerResult<String>, content_cache::ProducerFailure> {
        self.0.produce(request).await
    }
}
