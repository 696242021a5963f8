//! Producer-wrapping orchestrators (spec §4.6, §4.7): compose a [`Cache`]
//! with an origin producer, implementing stale-while-revalidate,
//! stale-if-error, request collapsing, supplemental-resource caching,
//! uncacheable-request bypass, and cache-read-failure fallback.
//!
//! [`Cache`]: crate::cache::Cache

mod key;

pub mod bulk;
pub mod single;

pub use bulk::BulkProducerCache;
pub use single::SingleProducerCache;

/// What to do when a producer wrapper's call into [`Cache::get`]/
/// [`Cache::get_many`] fails.
///
/// [`Cache::get`]: crate::cache::Cache::get
/// [`Cache::get_many`]: crate::cache::Cache::get_many
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheReadFailurePolicy {
    /// Propagate the failure to the wrapper's caller.
    Throw,
    /// Pretend the cache returned no usable or stale entries at all, and
    /// call the producer.
    CallProducer,
}

impl Default for CacheReadFailurePolicy {
    fn default() -> Self {
        CacheReadFailurePolicy::CallProducer
    }
}

/// A predicate deciding whether a request is cacheable at all. Defaults to
/// always-true.
pub type IsCacheableFn = std::sync::Arc<dyn Fn(&str, &crate::param::Params) -> bool + Send + Sync>;

pub(crate) fn always_cacheable() -> IsCacheableFn {
    std::sync::Arc::new(|_id: &str, _params: &crate::param::Params| true)
}

/// Splits an owned [`ProducerResult`](crate::producer::ProducerResult) into
/// the normalized [`Entry`](crate::entry::Entry) handed back to the
/// wrapper's caller, and the full set of
/// [`RawResource`](crate::cache::RawResource)s (primary + supplementals,
/// spec §4.8) offered to [`Cache::store`](crate::cache::Cache::store).
pub(crate) fn split_producer_result<C, S>(
    cache: &crate::cache::Cache<C, S>,
    id: String,
    date: std::time::SystemTime,
    result: crate::producer::ProducerResult<C>,
) -> (crate::entry::Entry<C>, Vec<crate::cache::RawResource<C>>)
where
    C: Clone + Send + Sync + 'static,
    S: crate::store::Store<C>,
{
    let vary = cache.normalize_vary(&result.vary);
    let entry = crate::entry::Entry {
        id: id.clone(),
        vary: vary.clone(),
        content: result.content.clone(),
        initial_age: 0.0,
        date,
        directives: result.directives,
        validators: result.validators.clone().unwrap_or_default(),
    };

    let mut resources = Vec::with_capacity(1 + result.supplemental_resources.len());
    resources.push(crate::cache::RawResource {
        id,
        vary,
        content: result.content,
        initial_age: Some(0.0),
        date: Some(date),
        directives: result.directives,
        validators: result.validators,
    });
    for supplemental in result.supplemental_resources {
        let svary = cache.normalize_vary(&supplemental.vary);
        resources.push(crate::cache::RawResource {
            id: supplemental.id,
            vary: svary,
            content: supplemental.content,
            initial_age: Some(0.0),
            date: Some(date),
            directives: supplemental.directives,
            validators: supplemental.validators,
        });
    }
    (entry, resources)
}
