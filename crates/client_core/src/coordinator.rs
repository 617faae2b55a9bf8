//! Sends drafts and deletions to the content API and reconciles the local
//! store with what the server confirmed. The store is only touched after a
//! successful response.

use std::sync::Arc;

use shared::domain::{ContentKind, EntityId};
use tracing::{info, warn};

use crate::{
    api::ContentApi,
    draft::{Draft, DraftSource},
    entity::Entity,
    error::{DeleteError, LoadError, SaveError},
    store::EntityStore,
};

/// Operator confirmation for destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm_delete(&self, kind: ContentKind, id: &EntityId) -> bool;
}

pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm_delete(&self, _kind: ContentKind, _id: &EntityId) -> bool {
        true
    }
}

pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm_delete(&self, _kind: ContentKind, _id: &EntityId) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

#[derive(Clone)]
pub struct MutationCoordinator {
    api: Arc<dyn ContentApi>,
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn ContentApi>) -> Self {
        Self { api }
    }

    pub async fn load(
        &self,
        store: &mut EntityStore,
        include_unpublished: bool,
    ) -> Result<(), LoadError> {
        let kind = store.kind();
        let entities = self
            .api
            .list(kind, include_unpublished)
            .await
            .map_err(|source| {
                warn!(%kind, "failed to load content: {source}");
                LoadError::Remote { kind, source }
            })?;
        store.load(entities)?;
        info!(%kind, count = store.len(), "content loaded");
        Ok(())
    }

    /// Creates or updates the draft's entity and upserts the server's copy,
    /// which is authoritative for id and slug.
    pub async fn save(&self, draft: &Draft, store: &mut EntityStore) -> Result<Entity, SaveError> {
        draft.validate()?;
        if draft.is_uploading() {
            return Err(SaveError::UploadInFlight);
        }

        let kind = draft.kind();
        let submission = draft.submission();
        let result = match draft.source() {
            DraftSource::New => self.api.create(&submission).await,
            DraftSource::Existing(id) => self.api.update(id, &submission).await,
        };
        let saved = result.map_err(|source| {
            warn!(%kind, draft = %draft.id(), "save failed: {source}");
            SaveError::Remote { kind, source }
        })?;

        if saved.kind() != kind {
            return Err(SaveError::InvalidResponse {
                kind,
                reason: format!("expected a {kind}, got a {}", saved.kind()),
            });
        }
        if saved.id.is_none() {
            return Err(SaveError::InvalidResponse {
                kind,
                reason: "response has no id".to_string(),
            });
        }
        let outcome = store
            .upsert(saved.clone())
            .map_err(|err| SaveError::InvalidResponse {
                kind,
                reason: err.to_string(),
            })?;
        info!(
            %kind,
            id = ?saved.id.as_ref().map(EntityId::as_str),
            slug = %saved.slug,
            ?outcome,
            "content saved"
        );
        Ok(saved)
    }

    /// Removes the entity remotely, then locally. A denied confirmation makes
    /// no request at all.
    pub async fn delete(
        &self,
        kind: ContentKind,
        id: &EntityId,
        confirm: &dyn Confirm,
        store: &mut EntityStore,
    ) -> Result<DeleteOutcome, DeleteError> {
        if !confirm.confirm_delete(kind, id) {
            info!(%kind, %id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }
        self.api.delete(kind, id).await.map_err(|source| {
            warn!(%kind, %id, "delete failed: {source}");
            DeleteError::Remote {
                kind,
                id: id.clone(),
                source,
            }
        })?;
        store.remove(id);
        info!(%kind, %id, "content deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
