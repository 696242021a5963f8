//! Directive normalizer (spec §4.1): coerces producer- and consumer-supplied
//! directives into canonical form — non-negative, monotonically increasing
//! staleness thresholds. Total functions; no I/O; no error path, since
//! violations are clamped rather than rejected (spec §7, `DirectiveViolation`
//! is impossible at runtime).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `{withoutRevalidation, whileRevalidate, ifError}`, each non-negative
/// seconds, with `withoutRevalidation <= whileRevalidate <= ifError`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaxStale {
    /// Seconds of staleness servable without triggering revalidation.
    pub without_revalidation: f64,
    /// Seconds of staleness servable while a background revalidation runs.
    pub while_revalidate: f64,
    /// Seconds of staleness servable when the producer is erroring.
    pub if_error: f64,
}

/// Raw, possibly-invalid `MaxStale` as supplied by a caller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawMaxStale {
    /// See [`MaxStale::without_revalidation`].
    pub without_revalidation: f64,
    /// See [`MaxStale::while_revalidate`].
    pub while_revalidate: f64,
    /// See [`MaxStale::if_error`].
    pub if_error: f64,
}

/// Clamps each field to non-negative, then enforces monotonicity by
/// replacing violators with their predecessor's (already-clamped) value.
fn clamp_monotonic(without_revalidation: f64, while_revalidate: f64, if_error: f64) -> (f64, f64, f64) {
    let w = without_revalidation.max(0.0);
    let r = while_revalidate.max(0.0).max(w);
    let e = if_error.max(0.0).max(r);
    (w, r, e)
}

impl RawMaxStale {
    fn normalize(self) -> MaxStale {
        let (w, r, e) = clamp_monotonic(self.without_revalidation, self.while_revalidate, self.if_error);
        MaxStale { without_revalidation: w, while_revalidate: r, if_error: e }
    }
}

/// Producer-side directives, pre-normalization.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawProducerDirectives {
    /// See [`ProducerDirectives::fresh_until_age`].
    pub fresh_until_age: f64,
    /// See [`ProducerDirectives::max_stale`].
    pub max_stale: Option<RawMaxStale>,
    /// See [`ProducerDirectives::store_for`].
    pub store_for: Option<f64>,
}

/// Normalized producer directives (spec §3).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProducerDirectives {
    /// Non-negative seconds during which the entry is fresh from birth.
    pub fresh_until_age: f64,
    /// Optional staleness tolerance thresholds.
    pub max_stale: Option<MaxStale>,
    /// Maximum time an entry may remain in a store, measured from
    /// generation (not receipt).
    pub store_for: Option<f64>,
}

impl Default for ProducerDirectives {
    fn default() -> Self {
        RawProducerDirectives::default().normalize()
    }
}

/// `normalizeProducerDirectives`: `freshUntilAge <- max(0, raw.freshUntilAge)`;
/// clamps and enforces monotonicity on `maxStale` if present; passes
/// `storeFor` through unchanged.
impl RawProducerDirectives {
    pub fn normalize(self) -> ProducerDirectives {
        ProducerDirectives {
            fresh_until_age: self.fresh_until_age.max(0.0),
            max_stale: self.max_stale.map(RawMaxStale::normalize),
            store_for: self.store_for,
        }
    }
}

/// Consumer-side `maxStale`, pre-normalization. The optional
/// `fresh_until_age` lets the consumer tighten (never loosen) the effective
/// freshness lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawConsumerMaxStale {
    /// See [`ConsumerMaxStale::fresh_until_age`].
    pub fresh_until_age: Option<f64>,
    /// See [`MaxStale::without_revalidation`].
    pub without_revalidation: f64,
    /// See [`MaxStale::while_revalidate`].
    pub while_revalidate: f64,
    /// See [`MaxStale::if_error`].
    pub if_error: f64,
}

/// Normalized consumer-side `maxStale`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsumerMaxStale {
    /// Tightened freshness lifetime, if the consumer supplied one.
    pub fresh_until_age: Option<f64>,
    /// See [`MaxStale::without_revalidation`].
    pub without_revalidation: f64,
    /// See [`MaxStale::while_revalidate`].
    pub while_revalidate: f64,
    /// See [`MaxStale::if_error`].
    pub if_error: f64,
}

impl RawConsumerMaxStale {
    pub fn normalize(self) -> ConsumerMaxStale {
        let (w, r, e) = clamp_monotonic(self.without_revalidation, self.while_revalidate, self.if_error);
        ConsumerMaxStale {
            fresh_until_age: self.fresh_until_age.map(|v| v.max(0.0)),
            without_revalidation: w,
            while_revalidate: r,
            if_error: e,
        }
    }
}

impl ConsumerMaxStale {
    /// `{producer.whileRevalidate, producer.ifError}`-style plain `MaxStale`
    /// view, dropping the consumer-only `fresh_until_age` tightening field.
    pub fn as_max_stale(&self) -> MaxStale {
        MaxStale {
            without_revalidation: self.without_revalidation,
            while_revalidate: self.while_revalidate,
            if_error: self.if_error,
        }
    }
}

/// Raw consumer directives, pre-normalization.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawConsumerDirectives {
    /// See [`ConsumerDirectives::max_age`].
    pub max_age: Option<f64>,
    /// See [`ConsumerDirectives::max_stale`].
    pub max_stale: Option<RawConsumerMaxStale>,
}

/// Normalized consumer directives (spec §3).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsumerDirectives {
    /// Hard ceiling on entry age regardless of freshness.
    pub max_age: Option<f64>,
    /// Staleness tolerance, if the consumer is willing to accept stale data.
    pub max_stale: Option<ConsumerMaxStale>,
}

impl RawConsumerDirectives {
    pub fn normalize(self) -> ConsumerDirectives {
        ConsumerDirectives {
            max_age: self.max_age.map(|v| v.max(0.0)),
            max_stale: self.max_stale.map(RawConsumerMaxStale::normalize),
        }
    }
}
