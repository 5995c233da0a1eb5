//! Normalization of generator-authored actions.
//!
//! Actions arrive as loosely-shaped JSON. Every field is optional and any
//! field that does not parse is dropped or defaulted on its own, so one bad
//! field never blocks the rest of the event. This is the only place such
//! input is interpreted; everything downstream sees typed `Event`s.

use crate::directory::CharacterDirectory;
use crate::error::LedgerError;
use crate::event::{
    Event, EventDraft, EventMetadata, EventType, RelationshipChange, ScheduleInfo, StatusSnapshot,
};
use crate::graph::RelationshipGraph;
use crate::ids::EntityId;
use crate::ledger::EventLedger;
use crate::store::KeyValueStore;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Metadata key marking events that came through this boundary.
pub const SOURCE_KEY: &str = "source";

/// Value stored under [`SOURCE_KEY`].
pub const AI_ACTION_SOURCE: &str = "ai_action";

/// First non-blank string found under any of `keys`.
fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// A number, or a string holding one.
fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn entity_set(value: Option<&Value>) -> BTreeSet<EntityId> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(EntityId::from)
                .collect()
        })
        .unwrap_or_default()
}

fn relationship_change(value: &Value) -> Option<RelationshipChange> {
    let obj = value.as_object()?;
    Some(RelationshipChange {
        from: text(obj, &["from"]).map(EntityId::from),
        to: text(obj, &["to"]).map(EntityId::from),
        view_change: text(obj, &["view_change", "viewChange", "view"]),
        attitude_change: number(obj, &["attitude_change", "attitudeChange", "attitude"]),
    })
}

fn status_snapshot(value: &Value) -> Option<StatusSnapshot> {
    let obj = value.as_object()?;
    let snapshot = StatusSnapshot {
        outfit: text(obj, &["outfit"]),
        behavior: text(obj, &["behavior", "behaviour"]),
        inner_voice: text(obj, &["inner_voice", "innerVoice"]),
    };
    (!snapshot.is_empty()).then_some(snapshot)
}

/// Time of day as zero-padded `HH:MM`, so schedule keys sort as text.
fn time_of_day(raw: &str) -> Option<String> {
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
        .map(|time| time.format("%H:%M").to_string())
}

fn schedule(value: &Value, fallback_activity: &str) -> Option<ScheduleInfo> {
    let obj = value.as_object()?;
    let raw_date = text(obj, &["date"])?;
    let date = match NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(err) => {
            tracing::warn!(date = %raw_date, "dropping schedule with unreadable date: {err}");
            return None;
        }
    };
    let time = text(obj, &["time"]).and_then(|raw| {
        let time = time_of_day(&raw);
        if time.is_none() {
            tracing::warn!(time = %raw, "dropping unreadable schedule time");
        }
        time
    });
    let activity = text(obj, &["activity"]).unwrap_or_else(|| fallback_activity.to_string());
    Some(ScheduleInfo {
        date,
        time,
        activity,
        location: text(obj, &["location"]),
    })
}

/// Turn a raw action into a fully defaulted draft authored by `current_char`.
///
/// Missing participants default to the character and the self-identity. A
/// missing type reads as `schedule` when schedule information parsed and
/// `conversation` otherwise. The action's `status` is the author's own
/// snapshot and takes precedence over an entry for the author in
/// `status_snapshots`.
pub fn normalize_ai_action(
    action: &Value,
    current_char: &EntityId,
    self_id: &EntityId,
) -> EventDraft {
    let empty = Map::new();
    let obj = match action.as_object() {
        Some(obj) => obj,
        None => {
            tracing::warn!(author = %current_char, "AI action is not an object; recording an empty event");
            &empty
        }
    };

    let summary = text(obj, &["summary", "description"]).unwrap_or_default();

    let mut participants = entity_set(obj.get("participants"));
    if participants.is_empty() {
        participants.insert(current_char.clone());
        participants.insert(self_id.clone());
    }

    let relationship_changes: Vec<RelationshipChange> = obj
        .get("relationship_changes")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(relationship_change).collect())
        .unwrap_or_default();

    let mut status_snapshots: BTreeMap<EntityId, StatusSnapshot> = obj
        .get("status_snapshots")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter(|(id, _)| !id.trim().is_empty())
                .filter_map(|(id, v)| Some((EntityId::from(id.trim()), status_snapshot(v)?)))
                .collect()
        })
        .unwrap_or_default();
    if let Some(own) = obj.get("status").and_then(status_snapshot) {
        status_snapshots
            .entry(current_char.clone())
            .or_default()
            .overlay(&own);
    }

    let schedule_info = obj.get("schedule").and_then(|v| schedule(v, &summary));

    let event_type = text(obj, &["event_type", "type"])
        .and_then(|name| {
            let parsed = EventType::parse(&name);
            if parsed.is_none() {
                tracing::warn!(event_type = %name, "unknown event type; using default");
            }
            parsed
        })
        .or(schedule_info.as_ref().map(|_| EventType::Schedule));

    let visible_to = obj
        .get("visible_to")
        .map(|v| entity_set(Some(v)))
        .filter(|set| !set.is_empty());

    let mut metadata = EventMetadata::originated_by(current_char.clone());
    metadata
        .extra
        .insert(SOURCE_KEY.to_string(), Value::String(AI_ACTION_SOURCE.to_string()));

    EventDraft {
        id: None,
        timestamp: None,
        event_type,
        participants,
        summary,
        relationship_changes,
        status_snapshots,
        schedule_info,
        visible_to,
        metadata,
        completed: false,
    }
}

impl<S, G, D> EventLedger<S, G, D>
where
    S: KeyValueStore,
    G: RelationshipGraph,
    D: CharacterDirectory,
{
    /// Record an event from a generator-authored action on behalf of `current_char`.
    pub fn create_event_from_ai_action(
        &mut self,
        action: &Value,
        current_char: &EntityId,
    ) -> Result<Event, LedgerError> {
        let draft = normalize_ai_action(action, current_char, self.self_id());
        self.create_event(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(action: Value) -> EventDraft {
        normalize_ai_action(&action, &"alice".into(), &"USER_SELF".into())
    }

    #[test]
    fn test_empty_action_is_fully_defaulted() {
        let draft = normalize(json!({}));
        assert!(draft.event_type.is_none());
        assert!(draft.participants.contains(&"alice".into()));
        assert!(draft.participants.contains(&"USER_SELF".into()));
        assert_eq!(draft.metadata.originating_char, Some("alice".into()));
        assert_eq!(draft.metadata.extra[SOURCE_KEY], AI_ACTION_SOURCE);
        assert!(draft.relationship_changes.is_empty());
    }

    #[test]
    fn test_non_object_action_still_yields_draft() {
        let draft = normalize(json!("just text"));
        assert_eq!(draft.summary, "");
        assert_eq!(draft.participants.len(), 2);
    }

    #[test]
    fn test_full_action() {
        let draft = normalize(json!({
            "event_type": "offline",
            "participants": ["alice", "bob", 7, ""],
            "summary": "Met bob at the market",
            "relationship_changes": [
                {"from": "alice", "to": "bob", "view_change": "friend", "attitude_change": "0.3"},
                {"from": "bob"},
                "garbage"
            ],
            "status_snapshots": {"bob": {"outfit": "apron"}, "": {"outfit": "x"}},
            "status": {"behavior": "cheerful", "innerVoice": "what a day"}
        }));

        assert_eq!(draft.event_type, Some(EventType::Offline));
        assert_eq!(draft.participants.len(), 2);
        assert_eq!(draft.relationship_changes.len(), 2);
        assert_eq!(draft.relationship_changes[0].attitude_change, Some(0.3));
        assert!(draft.relationship_changes[1].endpoints().is_none());
        assert_eq!(draft.status_snapshots.len(), 2);
        let own = &draft.status_snapshots[&EntityId::from("alice")];
        assert_eq!(own.behavior.as_deref(), Some("cheerful"));
        assert_eq!(own.inner_voice.as_deref(), Some("what a day"));
    }

    #[test]
    fn test_schedule_parsing() {
        let draft = normalize(json!({
            "summary": "Dinner plans",
            "schedule": {"date": "2025-07-01", "time": "19:00", "location": "Luigi's"}
        }));
        assert_eq!(draft.event_type, Some(EventType::Schedule));
        let info = draft.schedule_info.unwrap();
        assert_eq!(info.activity, "Dinner plans");
        assert_eq!(info.time.as_deref(), Some("19:00"));

        let bad = normalize(json!({"type": "group", "schedule": {"date": "next friday"}}));
        assert!(bad.schedule_info.is_none());
        assert_eq!(bad.event_type, Some(EventType::Group));
    }

    #[test]
    fn test_schedule_times_are_zero_padded() {
        let time_of = |raw: &str| {
            normalize(json!({"schedule": {"date": "2025-07-01", "time": raw}}))
                .schedule_info
                .unwrap()
                .time
        };
        assert_eq!(time_of("9:00").as_deref(), Some("09:00"));
        assert_eq!(time_of("21:30:15").as_deref(), Some("21:30"));
        assert_eq!(time_of("7pm"), None);

        let early = normalize(json!({"schedule": {"date": "2025-07-01", "time": "9:00"}}));
        let late = normalize(json!({"schedule": {"date": "2025-07-01", "time": "10:00"}}));
        assert!(early.schedule_info.unwrap().sort_key() < late.schedule_info.unwrap().sort_key());
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let draft = normalize(json!({"event_type": "party"}));
        assert!(draft.event_type.is_none());
    }

    #[test]
    fn test_ledger_ingestion_tags_originator() {
        let mut ledger = EventLedger::in_memory(crate::config::LedgerConfig::new());
        let event = ledger
            .create_event_from_ai_action(
                &json!({
                    "summary": "Heard bob and carol fighting",
                    "participants": ["bob", "carol"],
                    "relationship_changes": [{"from": "bob", "to": "carol", "view": "enemy"}]
                }),
                &"alice".into(),
            )
            .unwrap();

        assert_eq!(event.originator(), Some(&EntityId::from("alice")));
        assert_eq!(event.event_type, EventType::Conversation);
        assert_eq!(ledger.rumors().unwrap().len(), 1);
        assert!(ledger
            .graph()
            .get_relationship(&"bob".into(), &"carol".into())
            .is_none());
    }
}
