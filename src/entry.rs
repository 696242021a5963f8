//! The stored, normalized resource (spec §3) and its derived quantities:
//! `birthDate`, `age`, `isFresh`, `isValidatable`, `potentiallyUsefulFor`.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use crate::directives::ProducerDirectives;
use crate::param::Vary;

/// Opaque validator mapping (e.g. an etag or version token). Non-empty means
/// the entry carries validation information a producer could use to cheaply
/// confirm the stored entry still matches origin state.
pub type Validators = BTreeMap<String, String>;

/// A stored, normalized producer result — the unit returned by a [`Store`]
/// and classified by [`crate::classify::classify`].
///
/// [`Store`]: crate::store::Store
#[derive(Clone, Debug, PartialEq)]
pub struct Entry<C> {
    /// Opaque identifier; part of the primary key.
    pub id: String,
    /// Secondary key: which request params this entry's production depended on.
    pub vary: Vary,
    /// Opaque payload.
    pub content: C,
    /// Age, in seconds, at the moment of `date`. Always non-negative.
    pub initial_age: f64,
    /// Wall-clock instant this entry was received by the current cache.
    pub date: SystemTime,
    /// Normalized producer directives governing freshness/staleness.
    pub directives: ProducerDirectives,
    /// Opaque validator mapping; non-empty iff [`Entry::is_validatable`].
    pub validators: Validators,
}

impl<C> Entry<C> {
    /// `birthDate(e) = e.date - e.initialAge * 1s` — when the origin
    /// produced the content.
    pub fn birth_date(&self) -> SystemTime {
        let initial_age = Duration::from_secs_f64(self.initial_age.max(0.0));
        self.date
            .checked_sub(initial_age)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    /// `age(e, at) = (at - birthDate(e))` in seconds. May be negative if
    /// `at` precedes birth.
    pub fn age(&self, at: SystemTime) -> f64 {
        let birth = self.birth_date();
        match at.duration_since(birth) {
            Ok(elapsed) => elapsed.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        }
    }

    /// `isFresh(e, at) <=> 0 <= age(e, at) <= e.directives.freshUntilAge`.
    pub fn is_fresh(&self, at: SystemTime) -> bool {
        let age = self.age(at);
        (0.0..=self.directives.fresh_until_age).contains(&age)
    }

    /// `isValidatable(e) <=> e.validators is non-empty`.
    pub fn is_validatable(&self) -> bool {
        !self.validators.is_empty()
    }

    /// Maximum remaining time this entry could ever still be useful for,
    /// in seconds (may be `f64::INFINITY`). See
    /// [`crate::cache::calculate_store_for`] for the full formula this
    /// participates in.
    pub fn potentially_useful_for(&self, now: SystemTime) -> f64 {
        match (&self.directives.max_stale, self.is_validatable()) {
            (Some(max_stale), false) => {
                self.directives.fresh_until_age + max_stale.if_error - self.age(now)
            }
            _ => f64::INFINITY,
        }
    }
}
