//! Authoritative in-memory list for one content kind.

use shared::domain::{ContentKind, EntityId};
use tracing::warn;

use crate::{entity::Entity, error::StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Entities ordered most recently created first. Every stored entity has an
/// id and no id appears twice.
#[derive(Debug, Clone)]
pub struct EntityStore {
    kind: ContentKind,
    entities: Vec<Entity>,
}

impl EntityStore {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            entities: Vec::new(),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Replaces the whole list, keeping the order the server sent.
    /// Entries without an id or repeating an earlier id are skipped.
    pub fn load(&mut self, entities: Vec<Entity>) -> Result<(), StoreError> {
        let mut loaded: Vec<Entity> = Vec::with_capacity(entities.len());
        for entity in entities {
            self.check_kind(&entity)?;
            let Some(id) = entity.id.as_ref() else {
                warn!(
                    kind = %self.kind,
                    title = %entity.title,
                    "skipping listed entity without id"
                );
                continue;
            };
            if loaded.iter().any(|existing| existing.id.as_ref() == Some(id)) {
                warn!(kind = %self.kind, %id, "skipping duplicate listed entity");
                continue;
            }
            loaded.push(entity);
        }
        self.entities = loaded;
        Ok(())
    }

    /// Inserts at the front when the id is new, otherwise replaces the
    /// stored entity in place.
    pub fn upsert(&mut self, entity: Entity) -> Result<UpsertOutcome, StoreError> {
        self.check_kind(&entity)?;
        let id = entity.id.clone().ok_or(StoreError::MissingId(self.kind))?;
        match self.position(&id) {
            Some(index) => {
                self.entities[index] = entity;
                Ok(UpsertOutcome::Replaced)
            }
            None => {
                self.entities.insert(0, entity);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    /// Returns the removed entity; absent ids are a no-op.
    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        self.position(id).map(|index| self.entities.remove(index))
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.position(id).map(|index| &self.entities[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn position(&self, id: &EntityId) -> Option<usize> {
        self.entities
            .iter()
            .position(|entity| entity.id.as_ref() == Some(id))
    }

    fn check_kind(&self, entity: &Entity) -> Result<(), StoreError> {
        if entity.kind() != self.kind {
            return Err(StoreError::KindMismatch {
                expected: self.kind,
                actual: entity.kind(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
