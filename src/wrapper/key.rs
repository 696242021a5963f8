//! Canonical collapsing keys (spec §4.5, §9): a deterministic string,
//! insensitive to key ordering, derived from `(id, params)`. `Params` is a
//! `BTreeMap`, so iterating it is already key-ordered — concatenating the
//! sorted pairs is a canonical digest without pulling in a JSON serializer
//! just for this.

use crate::param::{ParamValue, Params};

fn push_value(out: &mut String, value: &ParamValue) {
    match value {
        ParamValue::String(s) => {
            out.push('s');
            out.push(':');
            out.push_str(&s.len().to_string());
            out.push(':');
            out.push_str(s);
        }
        ParamValue::Number(n) => {
            out.push('n');
            out.push(':');
            out.push_str(&n.to_bits().to_string());
        }
        ParamValue::Bool(b) => {
            out.push('b');
            out.push(':');
            out.push(if *b { '1' } else { '0' });
        }
    }
}

/// Builds a collapsing key for a single request: `id` plus its params.
///
/// Param names are length-prefixed the same way string values are, so a
/// name containing `=`/`;` can't be crafted to make two distinct
/// `(name, value)` mappings collide on the same encoded key.
pub fn single_key(id: &str, params: &Params) -> String {
    let mut out = String::with_capacity(32 + params.len() * 16);
    out.push_str(id);
    out.push('|');
    for (name, value) in params {
        out.push_str(&name.len().to_string());
        out.push(':');
        out.push_str(name);
        out.push('=');
        push_value(&mut out, value);
        out.push(';');
    }
    out
}

/// Builds a collapsing key for a batch of requests: the sorted set of their
/// individual keys, joined. Order of `requests` does not affect the key,
/// since the individual keys are sorted before joining.
pub fn batch_key<'a>(requests: impl IntoIterator<Item = (&'a str, &'a Params)>) -> String {
    let mut keys: Vec<String> = requests.into_iter().map(|(id, params)| single_key(id, params)).collect();
    keys.sort();
    keys.join("\u{0}")
}
