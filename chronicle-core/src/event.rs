//! Event records and the drafts and patches that produce them.

use crate::ids::{EntityId, EventId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Kinds of recorded events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A direct exchange between entities.
    #[default]
    Conversation,
    /// Something that happened off-screen.
    Background,
    /// A multi-party scene.
    Group,
    /// A meeting outside the chat itself.
    Offline,
    /// A planned activity.
    Schedule,
}

impl EventType {
    /// Get the wire name for this event type.
    pub fn name(&self) -> &'static str {
        match self {
            EventType::Conversation => "conversation",
            EventType::Background => "background",
            EventType::Group => "group",
            EventType::Offline => "offline",
            EventType::Schedule => "schedule",
        }
    }

    /// Parse a wire name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "conversation" => Some(EventType::Conversation),
            "background" => Some(EventType::Background),
            "group" => Some(EventType::Group),
            "offline" => Some(EventType::Offline),
            "schedule" => Some(EventType::Schedule),
            _ => None,
        }
    }
}

/// A declared change to the relationship between two entities.
///
/// Both endpoints are optional because changes may come from an untrusted
/// generator; tuples missing either endpoint are kept on the event but never
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipChange {
    #[serde(default)]
    pub from: Option<EntityId>,
    #[serde(default)]
    pub to: Option<EntityId>,
    /// New social-role label `from` holds toward `to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_change: Option<String>,
    /// Signed attitude shift of `from` toward `to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attitude_change: Option<f64>,
}

impl RelationshipChange {
    /// Create a change from one entity toward another.
    pub fn new(from: impl Into<EntityId>, to: impl Into<EntityId>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
            view_change: None,
            attitude_change: None,
        }
    }

    /// Set the new role label.
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view_change = Some(view.into());
        self
    }

    /// Set the attitude shift.
    pub fn with_attitude(mut self, delta: f64) -> Self {
        self.attitude_change = Some(delta);
        self
    }

    /// Both endpoints, if present and non-blank.
    pub fn endpoints(&self) -> Option<(&EntityId, &EntityId)> {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) if !from.is_blank() && !to.is_blank() => Some((from, to)),
            _ => None,
        }
    }
}

/// Partial status of a character. Absent keys mean "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_voice: Option<String>,
}

impl StatusSnapshot {
    /// Check if no key is set.
    pub fn is_empty(&self) -> bool {
        self.outfit.is_none() && self.behavior.is_none() && self.inner_voice.is_none()
    }

    /// Overlay the keys present in `patch` onto this status.
    pub fn overlay(&mut self, patch: &StatusSnapshot) {
        if let Some(outfit) = &patch.outfit {
            self.outfit = Some(outfit.clone());
        }
        if let Some(behavior) = &patch.behavior {
            self.behavior = Some(behavior.clone());
        }
        if let Some(inner_voice) = &patch.inner_voice {
            self.inner_voice = Some(inner_voice.clone());
        }
    }
}

/// When and where a planned activity takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleInfo {
    pub date: NaiveDate,
    /// `HH:MM`, if the plan has a time of day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ScheduleInfo {
    /// Create a schedule entry for a date.
    pub fn new(date: NaiveDate, activity: impl Into<String>) -> Self {
        Self {
            date,
            time: None,
            activity: activity.into(),
            location: None,
        }
    }

    /// Set the time of day.
    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Set the location.
    pub fn in_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sort key: date followed by time, with a missing time reading as midnight.
    pub fn sort_key(&self) -> String {
        format!("{}{}", self.date, self.time.as_deref().unwrap_or("00:00"))
    }
}

/// Free-form event metadata with a typed originator slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Entity on whose behalf the event was authored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originating_char: Option<EntityId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventMetadata {
    /// Metadata naming an originator.
    pub fn originated_by(id: impl Into<EntityId>) -> Self {
        Self {
            originating_char: Some(id.into()),
            extra: Map::new(),
        }
    }

    /// Check if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.originating_char.is_none() && self.extra.is_empty()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub participants: BTreeSet<EntityId>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationship_changes: Vec<RelationshipChange>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub status_snapshots: BTreeMap<EntityId, StatusSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_info: Option<ScheduleInfo>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub visible_to: BTreeSet<EntityId>,
    #[serde(default, skip_serializing_if = "EventMetadata::is_empty")]
    pub metadata: EventMetadata,
    #[serde(default, skip_serializing_if = "is_false")]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub compressed: bool,
}

impl Event {
    /// Check if an entity took part in this event.
    pub fn involves(&self, id: &EntityId) -> bool {
        self.participants.contains(id)
    }

    /// Everyone allowed to know about the event: `visible_to` plus participants.
    pub fn audience(&self) -> BTreeSet<EntityId> {
        self.visible_to
            .iter()
            .chain(self.participants.iter())
            .cloned()
            .collect()
    }

    /// Check if an entity may know about this event.
    pub fn is_visible_to(&self, id: &EntityId) -> bool {
        self.participants.contains(id) || self.visible_to.contains(id)
    }

    /// The entity on whose behalf this event was authored.
    pub fn originator(&self) -> Option<&EntityId> {
        self.metadata.originating_char.as_ref()
    }

    /// The minimal record kept after compaction.
    ///
    /// Applying this to an existing stub yields an identical stub.
    pub fn to_stub(&self) -> Event {
        Event {
            id: self.id.clone(),
            timestamp: self.timestamp,
            event_type: self.event_type,
            participants: self.participants.clone(),
            summary: self.summary.clone(),
            relationship_changes: Vec::new(),
            status_snapshots: BTreeMap::new(),
            schedule_info: None,
            visible_to: BTreeSet::new(),
            metadata: EventMetadata::default(),
            completed: false,
            compressed: true,
        }
    }

    /// Merge a patch over this event. The ID never changes.
    pub fn apply_patch(&mut self, patch: EventPatch) {
        let EventPatch {
            id: _,
            timestamp,
            event_type,
            participants,
            summary,
            relationship_changes,
            status_snapshots,
            schedule_info,
            visible_to,
            metadata,
            completed,
        } = patch;

        if let Some(timestamp) = timestamp {
            self.timestamp = timestamp;
        }
        if let Some(event_type) = event_type {
            self.event_type = event_type;
        }
        if let Some(participants) = participants {
            self.participants = participants;
        }
        if let Some(summary) = summary {
            self.summary = summary;
        }
        if let Some(changes) = relationship_changes {
            self.relationship_changes = changes;
        }
        if let Some(snapshots) = status_snapshots {
            self.status_snapshots = snapshots;
        }
        if let Some(schedule_info) = schedule_info {
            self.schedule_info = schedule_info;
        }
        if let Some(visible_to) = visible_to {
            self.visible_to = visible_to;
        }
        if let Some(metadata) = metadata {
            self.metadata = metadata;
        }
        if let Some(completed) = completed {
            self.completed = completed;
        }
        self.widen_visibility();
    }

    /// Restore `visible_to ⊇ participants`.
    pub(crate) fn widen_visibility(&mut self) {
        let missing: Vec<EntityId> = self
            .participants
            .iter()
            .filter(|p| !self.visible_to.contains(*p))
            .cloned()
            .collect();
        self.visible_to.extend(missing);
    }
}

/// Input to `EventLedger::create_event`. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub id: Option<EventId>,
    pub timestamp: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
    pub participants: BTreeSet<EntityId>,
    pub summary: String,
    pub relationship_changes: Vec<RelationshipChange>,
    pub status_snapshots: BTreeMap<EntityId, StatusSnapshot>,
    pub schedule_info: Option<ScheduleInfo>,
    pub visible_to: Option<BTreeSet<EntityId>>,
    pub metadata: EventMetadata,
    pub completed: bool,
}

impl EventDraft {
    /// Start a draft with a summary.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Set the event type.
    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Add participants.
    pub fn with_participants<I, E>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EntityId>,
    {
        self.participants
            .extend(participants.into_iter().map(Into::into));
        self
    }

    /// Add a relationship change.
    pub fn with_change(mut self, change: RelationshipChange) -> Self {
        self.relationship_changes.push(change);
        self
    }

    /// Record a status snapshot for an entity.
    pub fn with_status(mut self, id: impl Into<EntityId>, snapshot: StatusSnapshot) -> Self {
        self.status_snapshots.insert(id.into(), snapshot);
        self
    }

    /// Attach schedule information.
    pub fn with_schedule(mut self, schedule: ScheduleInfo) -> Self {
        self.schedule_info = Some(schedule);
        self
    }

    /// Tag the originator.
    pub fn with_originator(mut self, id: impl Into<EntityId>) -> Self {
        self.metadata.originating_char = Some(id.into());
        self
    }

    /// Override the creation instant.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Restrict who may know about the event (participants are always added).
    pub fn visible_to<I, E>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EntityId>,
    {
        self.visible_to = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Fill every default and produce a complete event.
    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        let mut event = Event {
            id: self.id.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or(now),
            event_type: self.event_type.unwrap_or_default(),
            visible_to: self
                .visible_to
                .unwrap_or_else(|| self.participants.clone()),
            participants: self.participants,
            summary: self.summary,
            relationship_changes: self.relationship_changes,
            status_snapshots: self.status_snapshots,
            schedule_info: self.schedule_info,
            metadata: self.metadata,
            completed: self.completed,
            compressed: false,
        };
        event.widen_visibility();
        event
    }
}

/// Partial update for `EventLedger::update_event`.
///
/// `id` is accepted so loosely-built patches deserialize, but it is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub id: Option<EventId>,
    pub timestamp: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
    pub participants: Option<BTreeSet<EntityId>>,
    pub summary: Option<String>,
    pub relationship_changes: Option<Vec<RelationshipChange>>,
    pub status_snapshots: Option<BTreeMap<EntityId, StatusSnapshot>>,
    /// `Some(None)` clears the schedule.
    pub schedule_info: Option<Option<ScheduleInfo>>,
    pub visible_to: Option<BTreeSet<EntityId>>,
    pub metadata: Option<EventMetadata>,
    pub completed: Option<bool>,
}

impl EventPatch {
    /// A patch that replaces the summary.
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::default()
        }
    }
}
