//! The producer interface (spec §6.2) and supplemental-resource handling
//! (spec §4.8): the origin collaborator a wrapper calls on a cache miss.

use async_trait::async_trait;

use crate::directives::ProducerDirectives;
use crate::entry::Validators;
use crate::error::ProducerFailure;
use crate::param::Vary;
use crate::request::CacheRequest;

/// An additional resource returned alongside a primary producer result.
/// Cached under its own `(id, vary)` but never surfaced to the wrapper's
/// caller — a subsequent request to that `id` is required to benefit from
/// it (spec §4.8).
#[derive(Clone, Debug)]
pub struct SupplementalResource<C> {
    /// Opaque identifier, distinct from the primary request's id.
    pub id: String,
    /// Vary mapping for this supplemental resource.
    pub vary: Vary,
    /// Opaque payload.
    pub content: C,
    /// Producer directives governing this supplemental's freshness.
    pub directives: ProducerDirectives,
    /// Opaque validator mapping, if any.
    pub validators: Option<Validators>,
}

/// A producer's result for one request: a primary resource plus zero or
/// more supplemental resources. The primary's `id` is supplied by the
/// requesting call, not carried in the result.
#[derive(Clone, Debug)]
pub struct ProducerResult<C> {
    /// Vary mapping the producing call observed for the primary resource.
    pub vary: Vary,
    /// Opaque payload for the primary resource.
    pub content: C,
    /// Producer directives for the primary resource.
    pub directives: ProducerDirectives,
    /// Opaque validator mapping for the primary resource, if any.
    pub validators: Option<Validators>,
    /// Additional resources to cache alongside the primary.
    pub supplemental_resources: Vec<SupplementalResource<C>>,
}

/// A single-request producer: the origin collaborator behind a cache miss.
/// May fail to indicate origin unavailability; a successful value whose
/// content happens to represent an error is still treated as success.
#[async_trait]
pub trait Producer<C>: Send + Sync {
    /// Produces a result for `request`.
    async fn produce(&self, request: CacheRequest) -> Result<ProducerResult<C>, ProducerFailure>;
}

/// A bulk producer: the outer call never fails; failures are reported
/// per-element, in the same order as `requests`.
#[async_trait]
pub trait BulkProducer<C>: Send + Sync {
    /// Produces a result (or failure) for every request in `requests`, in
    /// the same order.
    async fn produce_many(
        &self,
        requests: Vec<CacheRequest>,
    ) -> Vec<Result<ProducerResult<C>, ProducerFailure>>;
}
