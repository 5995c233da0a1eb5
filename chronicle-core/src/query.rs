//! Read-side lookups and prompt digests.

use crate::config::LedgerConfig;
use crate::event::{Event, EventType};
use crate::ids::EntityId;
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::cmp::Ordering;

/// Digest returned when a character shares no events.
pub const NO_SHARED_EVENTS: &str = "(no shared events yet)";

/// Digest returned when a character has nothing planned.
pub const NO_SCHEDULE: &str = "(no upcoming plans)";

/// Default number of events returned by participant queries.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Filter for participant queries.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter {
    /// Maximum events returned; 0 means unlimited.
    pub limit: usize,
    /// Only events of this type.
    pub event_type: Option<EventType>,
    /// Only events at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUERY_LIMIT,
            event_type: None,
            since: None,
        }
    }
}

impl EventFilter {
    /// Set the limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Restrict to one type.
    pub fn of_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Restrict to events at or after an instant.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    fn matches(&self, event: &Event) -> bool {
        self.event_type.is_none_or(|t| event.event_type == t)
            && self.since.is_none_or(|since| event.timestamp >= since)
    }
}

/// Newest first; equal timestamps fall back to ID for a stable order.
fn newest_first(a: &&Event, b: &&Event) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.id.cmp(&a.id))
}

/// Read-only view over a snapshot of the ledger's events.
#[derive(Debug, Clone)]
pub struct QueryService {
    events: Vec<Event>,
    self_id: EntityId,
    event_context_limit: usize,
    schedule_context_limit: usize,
}

impl QueryService {
    /// Build a view over a set of events.
    pub fn new(events: Vec<Event>, config: &LedgerConfig) -> Self {
        Self {
            events,
            self_id: config.self_id.clone(),
            event_context_limit: config.event_context_limit,
            schedule_context_limit: config.schedule_context_limit,
        }
    }

    /// Get the total number of events in view.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if there are no events in view.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn select<'a>(
        &'a self,
        filter: &EventFilter,
        keep: impl Fn(&Event) -> bool,
    ) -> Vec<&'a Event> {
        let mut found: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| keep(e) && filter.matches(e))
            .collect();
        found.sort_by(newest_first);
        if filter.limit > 0 {
            found.truncate(filter.limit);
        }
        found
    }

    /// Events an entity took part in, newest first.
    pub fn get_events_by_participant(&self, id: &EntityId, filter: &EventFilter) -> Vec<&Event> {
        self.select(filter, |e| e.involves(id))
    }

    /// Events an entity is allowed to know about, newest first.
    pub fn get_known_events(&self, id: &EntityId, filter: &EventFilter) -> Vec<&Event> {
        self.select(filter, |e| e.is_visible_to(id))
    }

    /// Events every one of `ids` took part in, newest first.
    pub fn get_shared_events(&self, ids: &[EntityId]) -> Vec<&Event> {
        let mut found: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| ids.iter().all(|id| e.involves(id)))
            .collect();
        found.sort_by(newest_first);
        found
    }

    /// Planned events for a character, soonest first.
    ///
    /// With no date, everything from today on; with a date, only that day.
    pub fn get_schedule_events(&self, char_id: &EntityId, date: Option<NaiveDate>) -> Vec<&Event> {
        self.schedule_events_as_of(char_id, date, Local::now().date_naive())
    }

    /// Today's plans for a character.
    pub fn get_today_schedule(&self, char_id: &EntityId) -> Vec<&Event> {
        let today = Local::now().date_naive();
        self.schedule_events_as_of(char_id, Some(today), today)
    }

    pub(crate) fn schedule_events_as_of(
        &self,
        char_id: &EntityId,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Vec<&Event> {
        let mut found: Vec<(String, &Event)> = self
            .events
            .iter()
            .filter(|e| e.involves(char_id))
            .filter_map(|e| {
                let info = e.schedule_info.as_ref()?;
                let wanted = match date {
                    Some(date) => info.date == date,
                    None => info.date >= today,
                };
                wanted.then(|| (info.sort_key(), e))
            })
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        found.into_iter().map(|(_, e)| e).collect()
    }

    /// Bullet list of a character's recent events, for prompt injection.
    pub fn build_event_context(&self, char_id: &EntityId) -> String {
        self.build_event_context_with_limit(char_id, self.event_context_limit)
    }

    /// Bullet list of a character's `limit` most recent events.
    pub fn build_event_context_with_limit(&self, char_id: &EntityId, limit: usize) -> String {
        let events = self.get_events_by_participant(char_id, &EventFilter::default().limit(limit));
        if events.is_empty() {
            return NO_SHARED_EVENTS.to_string();
        }

        let mut context = String::new();
        for event in events {
            let date = event.timestamp.with_timezone(&Local).format("%Y/%m/%d");
            context.push_str(&format!("- [{date}] {}", event.summary));

            let others: Vec<&str> = event
                .participants
                .iter()
                .filter(|p| *p != char_id && *p != &self.self_id)
                .map(EntityId::as_str)
                .collect();
            if !others.is_empty() {
                context.push_str(&format!(" (with {})", others.join(", ")));
            }
            context.push('\n');
        }
        context
    }

    /// Bullet list of a character's next few plans.
    pub fn build_schedule_context(&self, char_id: &EntityId) -> String {
        self.schedule_context_as_of(char_id, Local::now().date_naive())
    }

    pub(crate) fn schedule_context_as_of(&self, char_id: &EntityId, today: NaiveDate) -> String {
        let upcoming = self.schedule_events_as_of(char_id, None, today);
        if upcoming.is_empty() {
            return NO_SCHEDULE.to_string();
        }

        let mut context = String::new();
        for event in upcoming.into_iter().take(self.schedule_context_limit) {
            let Some(info) = &event.schedule_info else {
                continue;
            };
            context.push_str(&format!("- {}", info.date));
            if let Some(time) = &info.time {
                context.push_str(&format!(" {time}"));
            }
            context.push_str(&format!(": {}", info.activity));
            if let Some(location) = &info.location {
                context.push_str(&format!(" @ {location}"));
            }
            context.push('\n');
        }
        context
    }
}
