//! The classifier (spec §4.2): maps `(entry, consumer directives, now)` to
//! one of four usability categories. Pure — no I/O, no shared state.

use std::time::SystemTime;

use crate::directives::{ConsumerDirectives, MaxStale};
use crate::entry::Entry;

/// The four usability categories an entry can fall into for a given
/// consumer request at a given instant. Variant order mirrors increasing
/// staleness tolerance required to use the entry (spec §8 property 1: a
/// classification can only move *forward* through this order as time
/// advances).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Fresh, or within the without-revalidation stale window.
    Usable,
    /// Stale, but usable while a background revalidation runs.
    UsableWhileRevalidate,
    /// Stale, but usable if the producer is currently erroring.
    UsableIfError,
    /// Not usable under any tolerance either party expressed.
    Unusable,
}

impl Classification {
    /// Position in the monotone staleness order; used by property tests
    /// that assert classification only ever moves forward as `now` advances.
    pub fn rank(self) -> u8 {
        match self {
            Classification::Usable => 0,
            Classification::UsableWhileRevalidate => 1,
            Classification::UsableIfError => 2,
            Classification::Unusable => 3,
        }
    }
}

/// Producer-side defaults when no `maxStale` directive was supplied:
/// `{+inf, +inf, +inf}`, mirroring HTTP's behavior when `max-stale` is
/// absent from the producer side.
fn effective_producer_max_stale(producer: Option<MaxStale>) -> MaxStale {
    producer.unwrap_or(MaxStale {
        without_revalidation: f64::INFINITY,
        while_revalidate: f64::INFINITY,
        if_error: f64::INFINITY,
    })
}

/// Consumer-side defaults when no `maxStale` directive was supplied: if the
/// producer supplied one, inherit its `whileRevalidate`/`ifError` but zero
/// out `withoutRevalidation`; otherwise `{0, 0, 0}`.
fn effective_consumer_max_stale(
    consumer: Option<MaxStale>,
    producer: Option<MaxStale>,
) -> MaxStale {
    match (consumer, producer) {
        (Some(consumer), _) => consumer,
        (None, Some(producer)) => MaxStale {
            without_revalidation: 0.0,
            while_revalidate: producer.while_revalidate,
            if_error: producer.if_error,
        },
        (None, None) => MaxStale { without_revalidation: 0.0, while_revalidate: 0.0, if_error: 0.0 },
    }
}

/// `classify(entry, consumerDirs, now)`. See spec §4.2 for the full
/// algorithm; each numbered step below corresponds to the spec's steps.
pub fn classify<C>(
    entry: &Entry<C>,
    consumer: &ConsumerDirectives,
    now: SystemTime,
) -> Classification {
    let age = entry.age(now);

    // 1. Hard ceiling: no other rule can override it.
    if let Some(max_age) = consumer.max_age {
        if age > max_age {
            return Classification::Unusable;
        }
    }

    // 2-3. Effective freshness lifetime.
    let consumer_fresh_until_age = consumer
        .max_stale
        .as_ref()
        .and_then(|m| m.fresh_until_age)
        .unwrap_or(f64::INFINITY);
    let fresh_lifetime = consumer_fresh_until_age.min(entry.directives.fresh_until_age);

    // 4. Within the effective freshness lifetime.
    if age <= fresh_lifetime {
        return Classification::Usable;
    }

    // 5. Neither party tolerates staleness at all.
    if consumer.max_stale.is_none() && entry.directives.max_stale.is_none() {
        return Classification::Unusable;
    }

    // 6. Effective maxStale on each side.
    let producer_max_stale = effective_producer_max_stale(entry.directives.max_stale);
    let consumer_max_stale = effective_consumer_max_stale(
        consumer.max_stale.as_ref().map(|m| m.as_max_stale()),
        entry.directives.max_stale,
    );

    // 7. Per-field minimums classify the overshoot past the fresh lifetime.
    let overshoot = age - fresh_lifetime;
    let min_without_revalidation =
        producer_max_stale.without_revalidation.min(consumer_max_stale.without_revalidation);
    let min_while_revalidate =
        producer_max_stale.while_revalidate.min(consumer_max_stale.while_revalidate);
    let min_if_error = producer_max_stale.if_error.min(consumer_max_stale.if_error);

    if overshoot <= min_without_revalidation {
        Classification::Usable
    } else if overshoot <= min_while_revalidate {
        Classification::UsableWhileRevalidate
    } else if overshoot <= min_if_error {
        Classification::UsableIfError
    } else {
        Classification::Unusable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{ConsumerMaxStale, ProducerDirectives};
    use std::time::Duration;

    fn base_entry(fresh_until_age: f64, max_stale: Option<MaxStale>) -> Entry<()> {
        Entry {
            id: "id".into(),
            vary: Default::default(),
            content: (),
            initial_age: 0.0,
            date: SystemTime::UNIX_EPOCH,
            directives: ProducerDirectives { fresh_until_age, max_stale, store_for: None },
            validators: Default::default(),
        }
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn max_age_is_a_hard_ceiling() {
        let entry = base_entry(1000.0, None);
        let consumer = ConsumerDirectives { max_age: Some(5.0), max_stale: None };
        assert_eq!(classify(&entry, &consumer, at(6)), Classification::Unusable);
    }

    #[test]
    fn fresh_entry_is_usable() {
        let entry = base_entry(10.0, None);
        let consumer = ConsumerDirectives::default();
        assert_eq!(classify(&entry, &consumer, at(5)), Classification::Usable);
    }

    #[test]
    fn no_max_stale_either_side_is_unusable_once_stale() {
        let entry = base_entry(1.0, None);
        let consumer = ConsumerDirectives::default();
        assert_eq!(classify(&entry, &consumer, at(2)), Classification::Unusable);
    }

    #[test]
    fn classification_only_moves_forward_with_time() {
        let entry = base_entry(
            1.0,
            Some(MaxStale { without_revalidation: 0.0, while_revalidate: 2.0, if_error: 4.0 }),
        );
        let consumer = ConsumerDirectives::default();
        let mut last_rank = 0;
        for secs in 0..10 {
            let rank = classify(&entry, &consumer, at(secs)).rank();
            assert!(rank >= last_rank, "classification regressed at t={secs}");
            last_rank = rank;
        }
    }

    #[test]
    fn boundary_ties_classify_into_tighter_bucket() {
        let entry = base_entry(
            1.0,
            Some(MaxStale { without_revalidation: 1.0, while_revalidate: 2.0, if_error: 3.0 }),
        );
        let consumer = ConsumerDirectives::default();
        // age == 2 -> overshoot == 1 == without_revalidation boundary
        assert_eq!(classify(&entry, &consumer, at(2)), Classification::Usable);
        // age == 3 -> overshoot == 2 == while_revalidate boundary
        assert_eq!(classify(&entry, &consumer, at(3)), Classification::UsableWhileRevalidate);
        // age == 4 -> overshoot == 3 == if_error boundary
        assert_eq!(classify(&entry, &consumer, at(4)), Classification::UsableIfError);
        // age == 5 -> overshoot == 4 > if_error
        assert_eq!(classify(&entry, &consumer, at(5)), Classification::Unusable);
    }

    #[test]
    fn consumer_can_tighten_but_not_loosen_freshness() {
        let entry = base_entry(100.0, None);
        let consumer = ConsumerDirectives {
            max_age: None,
            max_stale: Some(ConsumerMaxStale {
                fresh_until_age: Some(1.0),
                without_revalidation: 0.0,
                while_revalidate: 0.0,
                if_error: 0.0,
            }),
        };
        assert_eq!(classify(&entry, &consumer, at(2)), Classification::Unusable);
    }
}
