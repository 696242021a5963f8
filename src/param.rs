//! The [`Param`](ParamValue)/[`Vary`] data model shared by requests, producer
//! results, and stored entries.
//!
//! A request's params are an unordered mapping from names to JSON scalars; a
//! response's vary is the same key universe, but a value may also be the
//! explicit [`VaryValue::Absent`] marker meaning "the producing call saw this
//! param as missing" (distinct from the key not appearing in the map at all).

use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A JSON-scalar param value: string, number, or boolean. Never null or
/// undefined — those are represented by the *absence* of a key (see
/// [`RawParams`]) or by [`VaryValue::Absent`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    /// A UTF-8 string.
    String(String),
    /// A number. Stored as `f64`, matching JSON's single numeric type.
    Number(f64),
    /// A boolean.
    Bool(bool),
}

/// A fully normalized, request-side param mapping. Ordered by key so that a
/// serialization of it is a canonical, key-order-insensitive digest (used by
/// the request collapser, see [`crate::collapse`]).
pub type Params = BTreeMap<String, ParamValue>;

/// Raw, caller-supplied params, before normalization. A key mapped to `None`
/// means the caller passed it as missing/undefined; such keys are dropped
/// during normalization rather than becoming part of the key.
pub type RawParams = BTreeMap<String, Option<ParamValue>>;

/// A vary value: either a concrete param value the producing call observed,
/// or the explicit marker that the param was observed as missing.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VaryValue {
    /// The producing call saw this param with this value.
    Value(ParamValue),
    /// The producing call saw this param as missing.
    Absent,
}

/// A response's vary mapping: which request params it depends on, and what
/// they were observed as. Forms the secondary key alongside `id`.
pub type Vary = BTreeMap<String, VaryValue>;

/// Name and value normalizer functions applied uniformly to params and vary
/// keys/values. Defaults to the identity function for both, matching the
/// normalizer's "no-op unless configured" contract.
#[derive(Clone)]
pub struct Normalizers {
    name: Arc<dyn Fn(&str) -> String + Send + Sync>,
    value: Arc<dyn Fn(&ParamValue) -> ParamValue + Send + Sync>,
}

impl Normalizers {
    /// Builds a normalizer pair from explicit name/value functions.
    pub fn new(
        name: impl Fn(&str) -> String + Send + Sync + 'static,
        value: impl Fn(&ParamValue) -> ParamValue + Send + Sync + 'static,
    ) -> Self {
        Self { name: Arc::new(name), value: Arc::new(value) }
    }

    /// Applies the name normalizer.
    pub fn normalize_name(&self, name: &str) -> String {
        (self.name)(name)
    }

    /// Applies the value normalizer.
    pub fn normalize_value(&self, value: &ParamValue) -> ParamValue {
        (self.value)(value)
    }

    /// Normalizes raw, caller-supplied params: drops keys whose value is
    /// absent/undefined, then applies the name and value normalizers.
    pub fn normalize_params(&self, raw: &RawParams) -> Params {
        raw.iter()
            .filter_map(|(k, v)| {
                let v = v.as_ref()?;
                Some((self.normalize_name(k), self.normalize_value(v)))
            })
            .collect()
    }

    /// Normalizes a vary mapping: preserves [`VaryValue::Absent`] as-is,
    /// otherwise applies the value normalizer.
    pub fn normalize_vary(&self, raw: &Vary) -> Vary {
        raw.iter()
            .map(|(k, v)| {
                let v = match v {
                    VaryValue::Absent => VaryValue::Absent,
                    VaryValue::Value(value) => VaryValue::Value(self.normalize_value(value)),
                };
                (self.normalize_name(k), v)
            })
            .collect()
    }
}

impl Default for Normalizers {
    fn default() -> Self {
        Self::new(|name| name.to_owned(), |value| value.clone())
    }
}

/// Whether every `(name, value)` pair in `vary` is satisfied by `params`,
/// treating [`VaryValue::Absent`] as matching iff the key is missing from
/// `params`. Only scalar values participate in equality.
pub fn vary_matches(vary: &Vary, params: &Params) -> bool {
    vary.iter().all(|(key, expected)| match expected {
        VaryValue::Absent => !params.contains_key(key),
        VaryValue::Value(expected_value) => params.get(key) == Some(expected_value),
    })
}
