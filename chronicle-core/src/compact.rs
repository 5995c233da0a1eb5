//! Retention compaction.
//!
//! Events that are too old, or that fall outside the most recent
//! `max_count`, are replaced in place by stubs carrying only
//! `id`, `timestamp`, `type`, `participants` and `summary`. Compaction is
//! irreversible and idempotent: a stub compacts to itself.

use crate::config::RetentionPolicy;
use crate::event::Event;
use crate::ids::EventId;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Summary of one compaction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Events looked at.
    pub examined: usize,
    /// Events newly reduced to stubs.
    pub compressed: usize,
    /// Events selected that were already stubs.
    pub already_compressed: usize,
}

/// Compact `events` in place as of `now`.
pub fn compress_events(
    events: &mut BTreeMap<EventId, Event>,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> CompactionReport {
    // An age limit beyond chrono's range means no age limit.
    let cutoff = Duration::try_days(i64::from(policy.max_age_days))
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut order: Vec<(DateTime<Utc>, EventId)> = events
        .values()
        .map(|e| (e.timestamp, e.id.clone()))
        .collect();
    // Newest first; ties broken by ID so the rank is deterministic.
    order.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut report = CompactionReport {
        examined: order.len(),
        ..CompactionReport::default()
    };

    for (index, (timestamp, id)) in order.into_iter().enumerate() {
        let rank = index + 1;
        if rank <= policy.max_count && timestamp >= cutoff {
            continue;
        }
        let Some(event) = events.get_mut(&id) else {
            continue;
        };
        if event.compressed {
            report.already_compressed += 1;
        } else {
            report.compressed += 1;
        }
        *event = event.to_stub();
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventDraft, RelationshipChange, ScheduleInfo};

    fn events_at(ages_in_hours: &[i64], now: DateTime<Utc>) -> BTreeMap<EventId, Event> {
        ages_in_hours
            .iter()
            .enumerate()
            .map(|(i, hours)| {
                let event = EventDraft::new(format!("event {i}"))
                    .with_participants(["alice"])
                    .with_change(RelationshipChange::new("alice", "bob").with_attitude(0.1))
                    .with_originator("alice")
                    .at(now - Duration::hours(*hours))
                    .into_event(now);
                (event.id.clone(), event)
            })
            .collect()
    }

    #[test]
    fn test_count_limit_keeps_most_recent() {
        let now = Utc::now();
        let ages: Vec<i64> = (0..150).collect();
        let mut events = events_at(&ages, now);

        let report = compress_events(&mut events, RetentionPolicy::default(), now);
        assert_eq!(report.compressed, 50);

        let cutoff = now - Duration::hours(100);
        for event in events.values() {
            if event.timestamp > cutoff {
                assert!(!event.compressed, "{} should be intact", event.summary);
                assert_eq!(event.relationship_changes.len(), 1);
            } else {
                assert!(event.compressed, "{} should be a stub", event.summary);
                assert!(event.relationship_changes.is_empty());
                assert!(event.metadata.is_empty());
            }
        }
    }

    #[test]
    fn test_age_limit() {
        let now = Utc::now();
        let mut events = events_at(&[1, 24 * 29, 24 * 31, 24 * 400], now);

        let report = compress_events(&mut events, RetentionPolicy::default(), now);
        assert_eq!(report.compressed, 2);
        assert_eq!(events.values().filter(|e| e.compressed).count(), 2);
    }

    #[test]
    fn test_idempotent() {
        let now = Utc::now();
        let mut events = events_at(&[1, 2, 3, 24 * 60], now);
        let policy = RetentionPolicy {
            max_age_days: 30,
            max_count: 2,
        };

        compress_events(&mut events, policy, now);
        let first = serde_json::to_string(&events).unwrap();
        let report = compress_events(&mut events, policy, now);
        let second = serde_json::to_string(&events).unwrap();

        assert_eq!(first, second);
        assert_eq!(report.compressed, 0);
        assert_eq!(report.already_compressed, 2);
    }

    #[test]
    fn test_stub_drops_schedule_and_keeps_summary() {
        let now = Utc::now();
        let event = EventDraft::new("old plan")
            .with_participants(["alice"])
            .with_schedule(ScheduleInfo::new(now.date_naive(), "lunch"))
            .at(now - Duration::days(45))
            .into_event(now);
        let mut events = BTreeMap::new();
        events.insert(event.id.clone(), event);

        compress_events(&mut events, RetentionPolicy::default(), now);
        let stub = events.values().next().unwrap();
        assert!(stub.compressed);
        assert!(stub.schedule_info.is_none());
        assert_eq!(stub.summary, "old plan");
        assert!(stub.involves(&"alice".into()));
    }

    #[test]
    fn test_unbounded_age_limit_does_not_overflow() {
        let now = Utc::now();
        let mut events = events_at(&[0, 24 * 365 * 50], now);
        let policy = RetentionPolicy {
            max_age_days: u32::MAX,
            max_count: 10,
        };

        let report = compress_events(&mut events, policy, now);

        assert_eq!(report.examined, 2);
        assert_eq!(report.compressed, 0);
        assert!(events.values().all(|e| !e.compressed));
    }
}
