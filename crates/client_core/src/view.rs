//! One content type's editing screen: the list, the live draft and the
//! pending upload, driven through `&mut self` only.

use std::sync::Arc;

use shared::domain::{ContentKind, EntityId};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::debug;

use crate::{
    api::ContentApi,
    coordinator::{Confirm, DeleteOutcome, MutationCoordinator},
    draft::{Draft, DraftFormController, DraftSource, UploadApplied},
    entity::{Entity, FieldEdit},
    error::{DeleteError, DraftError, FormError, LoadError},
    store::EntityStore,
    upload::{
        ImageFile, ImageHost, ImagePreview, ImageUploadPipeline, UploadLimits, UploadResolution,
    },
};

pub struct ContentView {
    store: EntityStore,
    controller: DraftFormController,
    coordinator: MutationCoordinator,
    resolutions: mpsc::UnboundedReceiver<UploadResolution>,
}

impl ContentView {
    pub fn new(
        kind: ContentKind,
        api: Arc<dyn ContentApi>,
        host: Arc<dyn ImageHost>,
        limits: UploadLimits,
    ) -> Self {
        let (pipeline, resolutions) = ImageUploadPipeline::new(host, limits);
        Self {
            store: EntityStore::new(kind),
            controller: DraftFormController::new(pipeline),
            coordinator: MutationCoordinator::new(api),
            resolutions,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.store.kind()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.controller.draft()
    }

    pub async fn refresh(&mut self, include_unpublished: bool) -> Result<(), LoadError> {
        self.coordinator
            .load(&mut self.store, include_unpublished)
            .await
    }

    pub fn open_new(&mut self) -> &Draft {
        self.controller.open_new(self.store.kind())
    }

    /// Opens an edit copy of a loaded entity.
    pub fn open_existing(&mut self, id: &EntityId) -> Result<&Draft, DraftError> {
        let kind = self.store.kind();
        let entity = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| DraftError::UnknownEntity {
                kind,
                id: id.clone(),
            })?;
        Ok(self.controller.open_existing(entity))
    }

    pub fn set_field(&mut self, edit: FieldEdit) -> Result<(), DraftError> {
        self.controller.set_field(edit)
    }

    pub fn attach_image(&mut self, file: ImageFile) -> Result<ImagePreview, FormError> {
        self.controller.attach_image(file)
    }

    /// Awaits the next upload resolution and applies it. Returns `None`
    /// right away when nothing is pending or queued.
    pub async fn next_upload_resolution(&mut self) -> Option<UploadApplied> {
        if self.controller.pending_ticket().is_none() && self.resolutions.is_empty() {
            return None;
        }
        let resolution = self.resolutions.recv().await?;
        Some(self.controller.apply_upload(resolution))
    }

    /// Applies every resolution that already arrived without waiting.
    pub fn apply_ready_uploads(&mut self) -> Vec<UploadApplied> {
        let mut applied = Vec::new();
        loop {
            match self.resolutions.try_recv() {
                Ok(resolution) => applied.push(self.controller.apply_upload(resolution)),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Waits until the live draft has no pending upload. Stale resolutions
    /// met on the way are dropped; the current one is returned.
    pub async fn wait_for_upload(&mut self) -> Option<UploadApplied> {
        while self.controller.pending_ticket().is_some() {
            let resolution = self.resolutions.recv().await?;
            match self.controller.apply_upload(resolution) {
                UploadApplied::Stale(_) => continue,
                current => return Some(current),
            }
        }
        None
    }

    /// Submits the draft. On success the draft is closed and the store holds
    /// the server's copy; on failure the draft stays open with its data.
    /// Dropping the returned future leaves the draft open for editing.
    pub async fn save(&mut self) -> Result<Entity, FormError> {
        self.apply_ready_uploads();
        let draft = self.controller.begin_save()?;
        let mut attempt = SaveAttempt {
            controller: &mut self.controller,
            settled: false,
        };
        let result = self.coordinator.save(&draft, &mut self.store).await;
        attempt.settled = true;
        match result {
            Ok(saved) => {
                attempt.controller.save_succeeded();
                Ok(saved)
            }
            Err(err) => {
                attempt.controller.save_failed(err.to_string());
                Err(err.into())
            }
        }
    }

    pub fn discard(&mut self) -> Option<Draft> {
        self.controller.discard()
    }

    /// Deletes a stored entity; an open draft of it is discarded as well.
    pub async fn delete(
        &mut self,
        id: &EntityId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, DeleteError> {
        let outcome = self
            .coordinator
            .delete(self.store.kind(), id, confirm, &mut self.store)
            .await?;
        let editing_deleted = self
            .controller
            .draft()
            .is_some_and(|draft| draft.source() == &DraftSource::Existing(id.clone()));
        if outcome == DeleteOutcome::Deleted && editing_deleted {
            debug!(%id, "closing draft of deleted entity");
            self.controller.discard();
        }
        Ok(outcome)
    }
}

/// Returns the draft to `Editing` if a save is dropped mid-flight.
struct SaveAttempt<'a> {
    controller: &'a mut DraftFormController,
    settled: bool,
}

impl Drop for SaveAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.save_abandoned();
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
