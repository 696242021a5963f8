//! Error taxonomy (spec §7). `DirectiveViolation` has no variant here: it is
//! impossible at runtime because [`crate::directives`] clamps violations
//! during normalization instead of rejecting them.

use std::fmt;
use std::sync::Arc;

/// A failure reported by a [`Store`](crate::store::Store) implementation.
/// Wraps an arbitrary source error; the store decides what that is.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// `get`/`getMany` failed.
    #[error("store read failed: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// `store` failed.
    #[error("store write failed: {0}")]
    Write(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// `delete` failed.
    #[error("store delete failed: {0}")]
    Delete(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// `close` failed.
    #[error("store close failed: {0}")]
    Close(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A failure raised by the [`Cache`](crate::cache::Cache) façade itself,
/// as opposed to the store it wraps.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The operation was attempted after [`Cache::close`](crate::cache::Cache::close)
    /// and the relevant close policy is `Throw`.
    #[error("operation attempted after Cache::close()")]
    Closed,
    /// The underlying store reported a failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A producer failure, shared cheaply so that every joiner of a collapsed
/// call observes the identical error (spec §8 property 10: collapsed
/// results, including error identity, are shared across joiners).
#[derive(Clone)]
pub struct ProducerFailure(pub Arc<dyn std::error::Error + Send + Sync>);

impl ProducerFailure {
    /// Wraps any error as a `ProducerFailure`.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}

impl fmt::Debug for ProducerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ProducerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ProducerFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// The error surfaced to a caller of a single- or bulk-producer wrapper.
/// Recovery (stale-if-error, optional cache-read fallback) happens before
/// this type is ever constructed; once built, it propagates unchanged.
///
/// `CacheRead` wraps its source in an `Arc` (rather than embedding
/// [`StoreError`] directly) so that a single failed batched cache read can be
/// reported identically to every request the bulk wrapper's call covered,
/// the same sharing shape [`ProducerFailure`] uses.
#[derive(Clone, thiserror::Error, Debug)]
pub enum WrapperError {
    /// The cache was closed and its on-get policy is `Throw`.
    #[error("cache is closed")]
    ClosedCache,
    /// Reading the cache failed and `on_cache_read_failure` is `Throw`.
    #[error("cache read failed: {0}")]
    CacheRead(#[source] Arc<CacheError>),
    /// The producer failed and no stale-if-error entry was available to
    /// substitute.
    #[error(transparent)]
    Producer(#[from] ProducerFailure),
}

impl From<CacheError> for WrapperError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Closed => WrapperError::ClosedCache,
            other => WrapperError::CacheRead(Arc::new(other)),
        }
    }
}
