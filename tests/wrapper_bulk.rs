//! Integration test for `BulkProducerCache` (spec §4.7, §8 scenario F):
//! mixed hit/stale-while-revalidate/miss/uncacheable requests in one batch,
//! producer call counts, and input-order preservation.

mod support;

use std::sync::Arc;
use std::time::Duration;

use content_cache::param::Params;
use content_cache::{BulkProducerCache, Cache};
use support::{raw_resource, raw_resource_aged, EchoBulkProducer, MemoryStore};

#[tokio::test]
async fn scenario_f_mixed_batch_calls_producer_for_uncached_and_uncacheable_then_revalidates_swr_in_background() {
    let cache = Arc::new(Cache::new(MemoryStore::new()));
    cache.store(vec![raw_resource("fresh", 10.0, None)]).await.unwrap();
    cache
        .store(vec![raw_resource_aged("stale_swr", 0.05, Some((0.0, 0.5, 0.5)), 0.1)])
        .await
        .unwrap();
    // "uncached" and "blocked" are deliberately absent from the store.

    let producer = Arc::new(EchoBulkProducer::new(10.0));
    let wrapper = BulkProducerCache::new(Arc::clone(&cache), SharedBulkProducer(Arc::clone(&producer)))
        .with_is_cacheable(Arc::new(|id: &str, _params: &Params| id != "blocked"));

    let results = wrapper.get_many(vec!["fresh", "stale_swr", "uncached", "blocked"]).await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap().content, "content:fresh");
    assert_eq!(results[1].as_ref().unwrap().content, "content:stale_swr");
    assert_eq!(results[2].as_ref().unwrap().content, "produced:uncached");
    assert_eq!(results[3].as_ref().unwrap().content, "produced:blocked");

    // The uncacheable and needs-producer batches are awaited synchronously
    // before get_many returns; the SWR subset's revalidation is detached and
    // may or may not have run yet.
    assert!(producer.call_count() >= 2);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(producer.call_count(), 3, "exactly three producer batch calls: uncacheable, needs-producer, and the background SWR revalidation");
}

#[tokio::test]
async fn get_many_on_distinct_ids_returns_empty_lookups_for_unknown_ones() {
    let cache = Arc::new(Cache::new(MemoryStore::new()));
    cache.store(vec![raw_resource("known", 10.0, None)]).await.unwrap();
    let producer = Arc::new(EchoBulkProducer::new(10.0));
    let wrapper = BulkProducerCache::new(Arc::clone(&cache), SharedBulkProducer(Arc::clone(&producer)));

    let results = wrapper.get_many(vec!["known", "unknown"]).await;
    assert_eq!(results[0].as_ref().unwrap().content, "content:known");
    assert_eq!(results[1].as_ref().unwrap().content, "produced:unknown");
    assert_eq!(producer.call_count(), 1);
}

/// Wraps a shared `EchoBulkProducer` so both the wrapper and the test can
/// observe its call count.
struct SharedBulkProducer(Arc<EchoBulkProducer>);

#[async_trait::async_trait]
impl content_cache::BulkProducer<String> for SharedBulkProducer {
    async fn produce_many(
        &self,
        requests: Vec<content_cache::CacheRequest>,
    ) -> Vec<Result<content_cache::ProducerResult<String>, content_cache::ProducerFailure>> {
        self.0.produce_many(requests).await
    }
}
