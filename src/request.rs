//! The consumer-facing request shape: `(id, params, directives)`, used by
//! both the [`crate::cache::Cache`] façade and the producer wrappers.

use crate::directives::ConsumerDirectives;
use crate::param::{Params, RawParams};

/// A fully-completed request: every field filled in (empty maps for missing
/// params/directives, per spec §4.6 step 1 / §4.7 step 1).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheRequest {
    /// Opaque identifier, part of the primary key.
    pub id: String,
    /// Already-normalized params.
    pub params: Params,
    /// Normalized consumer directives.
    pub directives: ConsumerDirectives,
}

/// A request as a wrapper caller supplies it: `params`/`directives` are
/// optional and filled with empty defaults if absent.
#[derive(Clone, Debug, Default)]
pub struct PartialRequest {
    /// Opaque identifier.
    pub id: String,
    /// Raw, not-yet-normalized params, if any.
    pub params: Option<RawParams>,
    /// Consumer directives, if any.
    pub directives: Option<ConsumerDirectives>,
}

impl PartialRequest {
    /// Builds a request for a bare id with no params or directives.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), params: None, directives: None }
    }
}

impl From<&str> for PartialRequest {
    fn from(id: &str) -> Self {
        PartialRequest::new(id)
    }
}

impl From<String> for PartialRequest {
    fn from(id: String) -> Self {
        PartialRequest::new(id)
    }
}
