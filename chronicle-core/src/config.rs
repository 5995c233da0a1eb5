//! Ledger configuration.

use crate::ids::EntityId;

/// Self-identity used when nothing else is configured.
pub const DEFAULT_SELF_ID: &str = "USER_SELF";

/// When old events are reduced to stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Events older than this many days are compacted.
    pub max_age_days: u32,
    /// Only this many of the most recent events stay intact.
    pub max_count: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: 30,
            max_count: 100,
        }
    }
}

/// Configuration for an `EventLedger`.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// The user's own identity; always counts as a direct participant.
    pub self_id: EntityId,

    /// Store key holding the event collection.
    pub events_key: String,

    /// Store key holding the rumor collection.
    pub rumors_key: String,

    /// Default compaction thresholds.
    pub retention: RetentionPolicy,

    /// Events listed by `build_event_context` unless told otherwise.
    pub event_context_limit: usize,

    /// Upcoming plans listed by `build_schedule_context`.
    pub schedule_context_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerConfig {
    /// Create a config with the standard keys and limits.
    pub fn new() -> Self {
        Self {
            self_id: EntityId::from(DEFAULT_SELF_ID),
            events_key: "chronicle_events".to_string(),
            rumors_key: "chronicle_rumors".to_string(),
            retention: RetentionPolicy::default(),
            event_context_limit: 10,
            schedule_context_limit: 5,
        }
    }

    /// Overlay `CHRONICLE_*` environment variables onto the defaults.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(id) = std::env::var("CHRONICLE_SELF_ID") {
            if id.trim().is_empty() {
                tracing::warn!("empty CHRONICLE_SELF_ID, ignoring");
            } else {
                config.self_id = EntityId::from(id.trim());
            }
        }

        if let Ok(raw) = std::env::var("CHRONICLE_MAX_AGE_DAYS") {
            match raw.trim().parse() {
                Ok(days) => config.retention.max_age_days = days,
                Err(err) => tracing::warn!("invalid CHRONICLE_MAX_AGE_DAYS, ignoring: {err}"),
            }
        }

        if let Ok(raw) = std::env::var("CHRONICLE_MAX_EVENTS") {
            match raw.trim().parse() {
                Ok(count) => config.retention.max_count = count,
                Err(err) => tracing::warn!("invalid CHRONICLE_MAX_EVENTS, ignoring: {err}"),
            }
        }

        config
    }

    /// Set the self-identity.
    pub fn with_self_id(mut self, id: impl Into<EntityId>) -> Self {
        self.self_id = id.into();
        self
    }

    /// Set the store keys.
    pub fn with_keys(
        mut self,
        events_key: impl Into<String>,
        rumors_key: impl Into<String>,
    ) -> Self {
        self.events_key = events_key.into();
        self.rumors_key = rumors_key.into();
        self
    }

    /// Set the default retention thresholds.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Set how many events the event digest lists.
    pub fn with_event_context_limit(mut self, limit: usize) -> Self {
        self.event_context_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::new();
        assert_eq!(config.self_id, "USER_SELF");
        assert_eq!(config.retention.max_age_days, 30);
        assert_eq!(config.retention.max_count, 100);
        assert_eq!(config.event_context_limit, 10);
        assert_ne!(config.events_key, config.rumors_key);
    }

    #[test]
    fn test_builder() {
        let config = LedgerConfig::new()
            .with_self_id("me")
            .with_keys("ev", "ru")
            .with_retention(RetentionPolicy {
                max_age_days: 7,
                max_count: 10,
            });
        assert_eq!(config.self_id, "me");
        assert_eq!(config.events_key, "ev");
        assert_eq!(config.retention.max_count, 10);
    }
}
