#![warn(missing_docs)]
//! A protocol-agnostic content cache built on RFC 9111-style freshness
//! semantics: stored entries are classified `Usable`,
//! `UsableWhileRevalidate`, `UsableIfError`, or `Unusable` relative to a
//! consumer's directives, without any assumption that the underlying
//! content is HTTP.
//!
//! The crate is organized around three layers:
//!
//! - [`classify`] and [`directives`] implement the pure freshness algebra:
//!   no I/O, no async, total functions over entries and directives.
//! - [`cache`] is the façade over an external [`store::Store`]
//!   implementation: lookup, classification grouping, and storage.
//! - [`wrapper`] composes a [`cache::Cache`] with a [`producer::Producer`]
//!   or [`producer::BulkProducer`], adding request collapsing,
//!   stale-while-revalidate, and stale-if-error behavior.

pub mod cache;
pub mod classify;
pub mod collapse;
pub mod diagnostics;
pub mod directives;
pub mod entry;
pub mod error;
pub mod param;
pub mod producer;
pub mod request;
pub mod store;
pub mod wrapper;

pub use cache::{Cache, CacheOptions, ClosePolicy, LookupResult, RawResource};
pub use classify::{classify, Classification};
pub use collapse::Collapser;
pub use diagnostics::{CacheOutcome, DiagnosticEvent, Diagnostics};
pub use directives::{ConsumerDirectives, MaxStale, ProducerDirectives};
pub use entry::Entry;
pub use error::{CacheError, ProducerFailure, StoreError, WrapperError};
pub use param::{ParamValue, Params, Vary, VaryValue};
pub use producer::{BulkProducer, Producer, ProducerResult, SupplementalResource};
pub use request::{CacheRequest, PartialRequest};
pub use store::Store;
pub use wrapper::{BulkProducerCache, CacheReadFailurePolicy, SingleProducerCache};
