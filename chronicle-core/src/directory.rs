//! Character directory contract.

use crate::error::StoreError;
use crate::event::StatusSnapshot;
use crate::ids::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a character is configured to regard another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSetting {
    pub role: String,
    pub attitude: String,
}

/// A simulated character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub status: StatusSnapshot,
    /// Profile-configured relations, keyed by the other entity.
    #[serde(default)]
    pub relation_settings: BTreeMap<EntityId, RelationSetting>,
}

impl Character {
    /// Create a character with an empty status.
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
            status: StatusSnapshot::default(),
            relation_settings: BTreeMap::new(),
        }
    }

    /// Configure how this character regards another entity.
    pub fn with_relation(
        mut self,
        other: impl Into<EntityId>,
        role: impl Into<String>,
        attitude: impl Into<String>,
    ) -> Self {
        self.relation_settings.insert(
            other.into(),
            RelationSetting {
                role: role.into(),
                attitude: attitude.into(),
            },
        );
        self
    }
}

/// Partial update to a character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterPatch {
    pub name: Option<String>,
    pub avatar: Option<String>,
    /// Replaces the whole status.
    pub status: Option<StatusSnapshot>,
}

/// Lookup and partial update of characters.
pub trait CharacterDirectory {
    /// Get a character by ID.
    fn get_character(&self, id: &EntityId) -> Option<Character>;

    /// Merge a patch into a character. Unknown IDs are ignored.
    fn update_character(&mut self, id: &EntityId, patch: CharacterPatch) -> Result<(), StoreError>;
}

/// In-process directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDirectory {
    characters: BTreeMap<EntityId, Character>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a character.
    pub fn insert(&mut self, character: Character) {
        self.characters.insert(character.id.clone(), character);
    }

    /// All characters, ordered by ID.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }
}

impl CharacterDirectory for MemoryDirectory {
    fn get_character(&self, id: &EntityId) -> Option<Character> {
        self.characters.get(id).cloned()
    }

    fn update_character(&mut self, id: &EntityId, patch: CharacterPatch) -> Result<(), StoreError> {
        if let Some(character) = self.characters.get_mut(id) {
            if let Some(name) = patch.name {
                character.name = name;
            }
            if let Some(avatar) = patch.avatar {
                character.avatar = Some(avatar);
            }
            if let Some(status) = patch.status {
                character.status = status;
            }
        }
        Ok(())
    }
}
