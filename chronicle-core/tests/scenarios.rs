//! End-to-end scenarios for the ledger, the change router and compaction.
//!
//! Run with: `cargo test -p chronicle-core --test scenarios`

use chrono::{Duration, Local, Utc};
use chronicle_core::testing::{sample_directory, RecordingGraph};
use chronicle_core::{
    CanonicalPair, CharacterDirectory, EntityId, EventDraft, EventFilter, EventLedger, EventPatch,
    EventType, LedgerConfig, MemoryStore, RelationshipChange, RelationshipGraph, ScheduleInfo,
    StatusSnapshot,
};
use serde_json::json;

fn ledger() -> EventLedger {
    EventLedger::in_memory(LedgerConfig::new())
}

fn recording_ledger() -> EventLedger<MemoryStore, RecordingGraph> {
    EventLedger::new(
        MemoryStore::new(),
        RecordingGraph::new(),
        sample_directory(),
        LedgerConfig::new(),
    )
}

fn id(s: &str) -> EntityId {
    EntityId::from(s)
}

// =============================================================================
// Direct participant writes the objective edge
// =============================================================================

#[test]
fn test_direct_change_updates_objective_edge() {
    let mut ledger = ledger();

    let event = ledger
        .create_event(
            EventDraft::new("Alice confided in you")
                .with_participants(["alice", "USER_SELF"])
                .with_change(
                    RelationshipChange::new("alice", "USER_SELF")
                        .with_view("亲密")
                        .with_attitude(0.5),
                )
                .with_originator("alice"),
        )
        .expect("Failed to create event");

    let edge = ledger
        .graph()
        .get_relationship(&id("alice"), &id("USER_SELF"))
        .expect("Edge should exist after a direct change");

    // "USER_SELF" sorts before "alice", so alice is node B.
    assert_eq!(edge.pair().a(), &id("USER_SELF"));
    assert_eq!(edge.b_view_of_a, "亲密");
    assert_eq!(edge.a_view_of_b, "acquainted");
    assert_eq!(edge.view_of(&id("alice")), Some("亲密"));

    assert_eq!(edge.change_log().len(), 1);
    let entry = &edge.change_log()[0];
    assert_eq!(entry.change, 0.5);
    assert_eq!(entry.event_id, event.id);
    assert_eq!(entry.reason, "Alice confided in you");

    assert!(edge.visible_to.contains(&id("alice")));
    assert!(edge.visible_to.contains(&id("USER_SELF")));
    assert_eq!(edge.backstory, format!("established via event {}", event.id));
}

// =============================================================================
// Bystander report becomes a rumor only
// =============================================================================

#[test]
fn test_bystander_change_is_rumor_only() {
    let mut ledger = recording_ledger();

    let before = ledger.graph().get_relationship(&id("bob"), &id("carol"));

    ledger
        .create_event(
            EventDraft::new("Alice watched Bob snub Carol")
                .with_participants(["bob", "carol", "USER_SELF"])
                .with_change(RelationshipChange::new("bob", "carol").with_view("讨厌"))
                .with_originator("alice"),
        )
        .expect("Failed to create event");

    let rumors = ledger.rumors().expect("Failed to read rumors");
    let pair = CanonicalPair::new(id("bob"), id("carol"));
    let rumor = rumors
        .get(&id("alice"), &pair)
        .expect("Alice should hold a rumor about bob and carol");
    assert_eq!(rumor.content_a_to_b.as_deref(), Some("讨厌"));
    assert!(rumor.content_b_to_a.is_none());
    assert_eq!(rumor.content_from(&id("bob")), Some("讨厌"));

    assert!(!ledger.graph().was_saved(&id("bob"), &id("carol")));
    assert_eq!(ledger.graph().get_relationship(&id("bob"), &id("carol")), before);
}

#[test]
fn test_rashomon_property_over_mixed_event() {
    let mut ledger = recording_ledger();

    ledger
        .create_event_from_ai_action(
            &json!({
                "summary": "Gossip at the bakery",
                "participants": ["alice", "bob", "carol", "dave"],
                "relationship_changes": [
                    {"from": "alice", "to": "bob", "view_change": "confidant", "attitude_change": 0.2},
                    {"from": "carol", "to": "alice", "attitude_change": -0.1},
                    {"from": "bob", "to": "carol", "view_change": "secret crush"},
                    {"from": "dave", "to": "carol", "view_change": "landlord"},
                    {"from": "dave", "to": "USER_SELF", "view_change": "neighbor"},
                    {"to": "carol"}
                ]
            }),
            &id("alice"),
        )
        .expect("Failed to ingest action");

    let graph = ledger.graph();
    assert!(graph.was_saved(&id("alice"), &id("bob")));
    assert!(graph.was_saved(&id("alice"), &id("carol")));
    assert!(graph.was_saved(&id("dave"), &id("USER_SELF")));
    assert!(!graph.was_saved(&id("bob"), &id("carol")));
    assert!(!graph.was_saved(&id("carol"), &id("dave")));
    assert_eq!(graph.saves().len(), 3);

    let rumors = ledger.rumors().expect("Failed to read rumors");
    assert_eq!(rumors.len(), 2);
    assert_eq!(rumors.entries_of(&id("alice")).count(), 2);

    // Reversed tuple lands in the B->A slot of the canonical rumor.
    let pair = CanonicalPair::new(id("carol"), id("dave"));
    let rumor = rumors.get(&id("alice"), &pair).expect("rumor about dave and carol");
    assert_eq!(rumor.content_b_to_a.as_deref(), Some("landlord"));
    assert!(rumor.content_a_to_b.is_none());
}

#[test]
fn test_rumor_keeps_other_direction() {
    let mut ledger = ledger();

    for (from, to, view) in [("bob", "carol", "admires"), ("carol", "bob", "ignores")] {
        ledger
            .create_event(
                EventDraft::new("overheard")
                    .with_participants([from, to])
                    .with_change(RelationshipChange::new(from, to).with_view(view))
                    .with_originator("alice"),
            )
            .expect("Failed to create event");
    }

    let rumors = ledger.rumors().expect("Failed to read rumors");
    let rumor = rumors
        .get(&id("alice"), &CanonicalPair::new(id("carol"), id("bob")))
        .expect("rumor should exist");
    assert_eq!(rumor.content_from(&id("bob")), Some("admires"));
    assert_eq!(rumor.content_from(&id("carol")), Some("ignores"));
    assert_eq!(rumors.len(), 1);
}

#[test]
fn test_subjective_graph_prefers_rumor_per_direction() {
    let mut ledger = ledger();

    ledger
        .create_event(
            EventDraft::new("Bob told you about Carol")
                .with_participants(["bob", "USER_SELF"])
                .with_change(RelationshipChange::new("bob", "carol").with_view("sibling"))
                .with_change(RelationshipChange::new("carol", "bob").with_view("sibling"))
                .with_originator("bob"),
        )
        .expect("Failed to create event");
    ledger
        .create_event(
            EventDraft::new("Alice thinks Carol is tired of Bob")
                .with_participants(["alice"])
                .with_change(RelationshipChange::new("carol", "bob").with_view("rival"))
                .with_originator("alice"),
        )
        .expect("Failed to create event");

    let subjective = ledger
        .subjective_graph(&id("alice"))
        .expect("Failed to build subjective graph");
    let edge = subjective
        .edges
        .iter()
        .find(|e| e.pair().involves(&id("bob")) && e.pair().involves(&id("carol")))
        .expect("edge between bob and carol");
    assert_eq!(edge.view_of(&id("carol")), Some("rival"));
    assert_eq!(edge.view_of(&id("bob")), Some("sibling"));

    let objective = ledger
        .graph()
        .get_relationship(&id("bob"), &id("carol"))
        .expect("objective edge");
    assert_eq!(objective.view_of(&id("carol")), Some("sibling"));

    let bobs = ledger
        .subjective_graph(&id("bob"))
        .expect("Failed to build subjective graph");
    assert_eq!(bobs.edges, ledger.graph().get_graph_data().edges);
}

// =============================================================================
// Status snapshots
// =============================================================================

#[test]
fn test_status_snapshots_merge_partially() {
    let mut ledger = recording_ledger();

    ledger
        .create_event(
            EventDraft::new("Rainy walk")
                .with_participants(["alice", "bob", "USER_SELF"])
                .with_status("alice", StatusSnapshot {
                    outfit: Some("raincoat".into()),
                    ..StatusSnapshot::default()
                })
                .with_status("bob", StatusSnapshot {
                    inner_voice: Some("should have brought an umbrella".into()),
                    ..StatusSnapshot::default()
                })
                .with_status("USER_SELF", StatusSnapshot {
                    behavior: Some("laughing".into()),
                    ..StatusSnapshot::default()
                })
                .with_status("stranger", StatusSnapshot {
                    outfit: Some("cloak".into()),
                    ..StatusSnapshot::default()
                }),
        )
        .expect("Failed to create event");
    ledger
        .create_event(
            EventDraft::new("Back inside").with_status("alice", StatusSnapshot {
                behavior: Some("drying off".into()),
                ..StatusSnapshot::default()
            }),
        )
        .expect("Failed to create event");

    let alice = ledger
        .directory()
        .get_character(&id("alice"))
        .expect("alice exists");
    assert_eq!(alice.status.outfit.as_deref(), Some("raincoat"));
    assert_eq!(alice.status.behavior.as_deref(), Some("drying off"));

    let bob = ledger.directory().get_character(&id("bob")).expect("bob exists");
    assert!(bob.status.outfit.is_none());
    assert!(bob.status.inner_voice.is_some());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_visible_to_covers_participants() {
    let mut ledger = ledger();
    let event = ledger
        .create_event(EventDraft::new("x").with_participants(["alice", "bob"]))
        .expect("Failed to create event");
    assert!(event.participants.is_subset(&event.visible_to));

    let restricted = ledger
        .create_event(
            EventDraft::new("secret")
                .with_participants(["alice"])
                .visible_to(["carol"]),
        )
        .expect("Failed to create event");
    assert!(restricted.participants.is_subset(&restricted.visible_to));

    let query = ledger.query().expect("Failed to query");
    let carols = query.get_known_events(&id("carol"), &EventFilter::default());
    assert_eq!(carols.len(), 1);
    assert!(query
        .get_events_by_participant(&id("carol"), &EventFilter::default())
        .is_empty());
}

#[test]
fn test_update_keeps_id() {
    let mut ledger = ledger();
    let event = ledger
        .create_event(EventDraft::new("original"))
        .expect("Failed to create event");

    let mut patch = EventPatch::summary("x");
    patch.id = Some("other".into());
    let updated = ledger
        .update_event(&event.id, patch)
        .expect("Failed to update event");

    assert_eq!(updated.id, event.id);
    assert_eq!(updated.summary, "x");
    let stored = ledger
        .get_event(&event.id)
        .expect("Failed to read event")
        .expect("event still stored");
    assert_eq!(stored.summary, "x");
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn test_participant_query_with_type_and_limit() {
    let mut ledger = ledger();
    let now = Utc::now();

    for hours_ago in 1..=5 {
        ledger
            .create_event(
                EventDraft::new(format!("chat {hours_ago}h ago"))
                    .with_participants(["alice", "USER_SELF"])
                    .at(now - Duration::hours(hours_ago)),
            )
            .expect("Failed to create event");
    }
    for days_ahead in [1, 2] {
        ledger
            .create_event(
                EventDraft::new("plan")
                    .with_type(EventType::Schedule)
                    .with_participants(["alice"])
                    .with_schedule(ScheduleInfo::new(
                        (now + Duration::days(days_ahead)).date_naive(),
                        "lunch",
                    )),
            )
            .expect("Failed to create event");
    }

    let query = ledger.query().expect("Failed to query");
    let found = query.get_events_by_participant(
        &id("alice"),
        &EventFilter::default().limit(2).of_type(EventType::Conversation),
    );
    let summaries: Vec<&str> = found.iter().map(|e| e.summary.as_str()).collect();
    assert_eq!(summaries, ["chat 1h ago", "chat 2h ago"]);

    let everything =
        query.get_events_by_participant(&id("alice"), &EventFilter::default().limit(0));
    assert_eq!(everything.len(), 7);
}

#[test]
fn test_schedule_excludes_past_dates() {
    let mut ledger = ledger();
    let today = Local::now().date_naive();

    for (offset, activity) in [(-1, "yesterday's dinner"), (0, "today's run"), (3, "concert")] {
        ledger
            .create_event(
                EventDraft::new(activity)
                    .with_type(EventType::Schedule)
                    .with_participants(["alice"])
                    .with_schedule(ScheduleInfo::new(today + Duration::days(offset), activity)),
            )
            .expect("Failed to create event");
    }

    let query = ledger.query().expect("Failed to query");
    let upcoming: Vec<&str> = query
        .get_schedule_events(&id("alice"), None)
        .iter()
        .map(|e| e.summary.as_str())
        .collect();
    assert_eq!(upcoming, ["today's run", "concert"]);

    let today_only = query.get_today_schedule(&id("alice"));
    assert_eq!(today_only.len(), 1);

    let digest = query.build_schedule_context(&id("alice"));
    assert!(!digest.contains("yesterday"));
    assert!(digest.contains("concert"));
}

#[test]
fn test_event_context_lists_other_participants() {
    let mut ledger = ledger();
    ledger
        .create_event(EventDraft::new("Picnic").with_participants(["alice", "bob", "USER_SELF"]))
        .expect("Failed to create event");

    let query = ledger.query().expect("Failed to query");
    let context = query.build_event_context(&id("alice"));
    assert!(context.starts_with("- ["));
    assert!(context.contains("Picnic (with bob)"));
    assert_eq!(
        query.build_event_context(&id("zed")),
        chronicle_core::query::NO_SHARED_EVENTS
    );
}

// =============================================================================
// Compaction
// =============================================================================

#[test]
fn test_compaction_keeps_most_recent_hundred() {
    let mut ledger = ledger();
    let now = Utc::now();

    for minutes_ago in 0..150 {
        ledger
            .create_event(
                EventDraft::new(format!("event {minutes_ago}"))
                    .with_participants(["alice"])
                    .with_change(RelationshipChange::new("alice", "bob").with_attitude(0.01))
                    .with_originator("alice")
                    .at(now - Duration::days(9) + Duration::minutes(150 - minutes_ago)),
            )
            .expect("Failed to create event");
    }

    let report = ledger
        .compress_old_events(30, 100)
        .expect("Failed to compact");
    assert_eq!(report.compressed, 50);

    let events = ledger.get_all_events().expect("Failed to read events");
    let mut by_age: Vec<_> = events.values().collect();
    by_age.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    for (rank, event) in by_age.iter().enumerate() {
        if rank < 100 {
            assert!(!event.compressed, "rank {rank} should be intact");
            assert_eq!(event.relationship_changes.len(), 1);
        } else {
            assert!(event.compressed, "rank {rank} should be a stub");
            assert!(event.relationship_changes.is_empty());
            assert!(event.originator().is_none());
        }
    }

    let first = serde_json::to_value(&events).expect("serialize");
    ledger
        .compress_old_events(30, 100)
        .expect("Failed to compact");
    let second = serde_json::to_value(ledger.get_all_events().expect("Failed to read events"))
        .expect("serialize");
    assert_eq!(first, second);

    // The edge's change log stays bounded no matter how many events fed it.
    let edge = ledger
        .graph()
        .get_relationship(&id("alice"), &id("bob"))
        .expect("edge exists");
    assert_eq!(edge.change_log().len(), 50);
}
