//! The single live draft and every edit made to it.
//!
//! A draft moves `Empty -> Editing -> Saving`, falls back to `Editing` when a
//! save fails, and is destroyed when it is saved or discarded. Image uploads
//! run beside the edits; their resolution only ever touches `image`.

use std::fmt;

use shared::domain::{ContentKind, EntityId};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    entity::{is_blank_html, Entity, FieldEdit, Metadata},
    error::{DraftError, FieldError, FormError, RequiredField, UploadError, ValidationError},
    slug,
    upload::{ImageFile, ImagePreview, ImageUploadPipeline, UploadResolution, UploadTicket},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftId(Uuid);

impl DraftId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftSource {
    New,
    Existing(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftPhase {
    Empty,
    Editing,
    Saving,
}

#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub ticket: UploadTicket,
    pub file: ImageFile,
    pub preview: ImagePreview,
}

#[derive(Debug, Clone)]
pub struct Draft {
    id: DraftId,
    source: DraftSource,
    entity: Entity,
    slug_locked: bool,
    phase: DraftPhase,
    pending_upload: Option<PendingUpload>,
    last_error: Option<String>,
    attempts: u64,
}

impl Draft {
    fn new(kind: ContentKind) -> Self {
        Self {
            id: DraftId::new(),
            source: DraftSource::New,
            entity: Entity::empty(kind),
            slug_locked: false,
            phase: DraftPhase::Empty,
            pending_upload: None,
            last_error: None,
            attempts: 0,
        }
    }

    fn from_entity(entity: Entity) -> Self {
        let source = match &entity.id {
            Some(id) => DraftSource::Existing(id.clone()),
            None => DraftSource::New,
        };
        Self {
            id: DraftId::new(),
            source,
            entity,
            // Persisted slugs never follow the title.
            slug_locked: true,
            phase: DraftPhase::Empty,
            pending_upload: None,
            last_error: None,
            attempts: 0,
        }
    }

    pub fn id(&self) -> DraftId {
        self.id
    }

    pub fn source(&self) -> &DraftSource {
        &self.source
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn kind(&self) -> ContentKind {
        self.entity.kind()
    }

    pub fn slug_locked(&self) -> bool {
        self.slug_locked
    }

    pub fn phase(&self) -> DraftPhase {
        self.phase
    }

    pub fn pending_upload(&self) -> Option<&PendingUpload> {
        self.pending_upload.as_ref()
    }

    pub fn is_uploading(&self) -> bool {
        self.pending_upload.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// What the form should show: the local preview while an upload is in
    /// flight, otherwise the stored image URL.
    pub fn display_image(&self) -> Option<&str> {
        self.pending_upload
            .as_ref()
            .map(|pending| pending.preview.data_url.as_str())
            .or(self.entity.image.as_deref())
    }

    /// The slug that would be submitted right now.
    pub fn final_slug(&self) -> String {
        if !self.kind().uses_slug() {
            return String::new();
        }
        if self.slug_locked {
            self.entity.slug.clone()
        } else {
            slug::generate(&self.entity.title)
        }
    }

    /// Structural required-field check; never touches the network.
    pub fn validation_errors(&self) -> Vec<FieldError> {
        let kind = self.kind();
        let missing = |field| FieldError { kind, field };
        let mut errors = Vec::new();

        if self.entity.title.trim().is_empty() {
            errors.push(missing(RequiredField::Title));
        } else if kind.uses_slug() && self.final_slug().trim().is_empty() {
            errors.push(missing(RequiredField::Slug));
        }
        if is_blank_html(&self.entity.body) {
            errors.push(missing(RequiredField::Body));
        }
        if let Metadata::Project(meta) = &self.entity.metadata {
            if meta.stack.trim().is_empty() {
                errors.push(missing(RequiredField::Stack));
            }
        }
        errors
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }

    /// The entity to send: final slug applied, list fields normalized.
    pub fn submission(&self) -> Entity {
        let mut entity = self.entity.clone();
        entity.slug = self.final_slug();
        entity.normalize_lists();
        entity
    }

    fn touch(&mut self) {
        if self.phase == DraftPhase::Empty {
            self.phase = DraftPhase::Editing;
        }
    }

    fn ensure_editable(&self) -> Result<(), DraftError> {
        if self.phase == DraftPhase::Saving {
            return Err(DraftError::SaveInProgress);
        }
        Ok(())
    }
}

/// What happened to an upload resolution handed to
/// [`DraftFormController::apply_upload`].
#[derive(Debug)]
pub enum UploadApplied {
    /// The remote URL is now the draft's image.
    Applied(String),
    /// The current attempt failed; the image is unchanged.
    Failed(UploadError),
    /// The attempt was superseded or its draft is gone.
    Stale(UploadTicket),
}

/// Owns the one live [`Draft`]. Opening another draft discards the current
/// one together with its pending upload.
pub struct DraftFormController {
    pipeline: ImageUploadPipeline,
    draft: Option<Draft>,
    upload_task: Option<JoinHandle<()>>,
}

impl DraftFormController {
    pub fn new(pipeline: ImageUploadPipeline) -> Self {
        Self {
            pipeline,
            draft: None,
            upload_task: None,
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn open_new(&mut self, kind: ContentKind) -> &Draft {
        self.replace(Draft::new(kind))
    }

    pub fn open_existing(&mut self, entity: Entity) -> &Draft {
        self.replace(Draft::from_entity(entity))
    }

    /// `open(entity?)`: an edit copy when an entity is given, otherwise an
    /// empty draft of `kind`. A given entity must be of `kind`.
    pub fn open(
        &mut self,
        kind: ContentKind,
        entity: Option<Entity>,
    ) -> Result<&Draft, DraftError> {
        match entity {
            Some(entity) if entity.kind() != kind => Err(DraftError::KindMismatch {
                expected: kind,
                actual: entity.kind(),
            }),
            Some(entity) => Ok(self.open_existing(entity)),
            None => Ok(self.open_new(kind)),
        }
    }

    pub fn set_field(&mut self, edit: FieldEdit) -> Result<(), DraftError> {
        let draft = self.draft.as_mut().ok_or(DraftError::NoDraft)?;
        draft.ensure_editable()?;

        let title_changed = matches!(edit, FieldEdit::Title(_));
        let slug_changed = matches!(edit, FieldEdit::Slug(_));
        edit.apply(&mut draft.entity)?;

        if slug_changed {
            // Hand-typed slugs go through the same normalization as derived ones.
            draft.entity.slug = slug::generate(&draft.entity.slug);
            if !draft.slug_locked {
                debug!(draft = %draft.id, "slug edited directly; locking it");
                draft.slug_locked = true;
            }
        }
        if title_changed && !draft.slug_locked && draft.kind().uses_slug() {
            draft.entity.slug = slug::generate(&draft.entity.title);
        }
        draft.touch();
        Ok(())
    }

    /// Pre-checks `file`, makes its preview available immediately and starts
    /// the upload in the background. A still pending earlier upload is
    /// superseded.
    ///
    /// Must be called from within a tokio runtime: the upload is spawned
    /// onto it.
    pub fn attach_image(&mut self, file: ImageFile) -> Result<ImagePreview, FormError> {
        let draft = self.draft.as_mut().ok_or(DraftError::NoDraft)?;
        draft.ensure_editable()?;
        self.pipeline.precheck(&file)?;

        draft.attempts += 1;
        let ticket = UploadTicket {
            draft: draft.id,
            attempt: draft.attempts,
        };
        let preview = ImagePreview::from_file(&file);
        if let Some(previous) = draft.pending_upload.take() {
            debug!(
                draft = %draft.id,
                superseded = previous.ticket.attempt,
                attempt = ticket.attempt,
                "superseding pending image upload"
            );
        }
        draft.pending_upload = Some(PendingUpload {
            ticket,
            file: file.clone(),
            preview: preview.clone(),
        });
        draft.last_error = None;
        draft.touch();

        if let Some(task) = self.upload_task.take() {
            task.abort();
        }
        self.upload_task = Some(self.pipeline.start(ticket, file));
        Ok(preview)
    }

    /// Applies an upload outcome if it belongs to the pending attempt of the
    /// live draft. Only the `image` field is written.
    pub fn apply_upload(&mut self, resolution: UploadResolution) -> UploadApplied {
        let UploadResolution { ticket, result } = resolution;
        let Some(draft) = self.draft.as_mut() else {
            debug!(attempt = ticket.attempt, "discarding upload resolution: no open draft");
            return UploadApplied::Stale(ticket);
        };
        let is_current = draft
            .pending_upload
            .as_ref()
            .is_some_and(|pending| pending.ticket == ticket);
        if !is_current {
            debug!(
                draft = %draft.id,
                attempt = ticket.attempt,
                "discarding stale upload resolution"
            );
            return UploadApplied::Stale(ticket);
        }

        draft.pending_upload = None;
        self.upload_task = None;
        match result {
            Ok(url) => {
                draft.entity.image = Some(url.clone());
                UploadApplied::Applied(url)
            }
            Err(err) => {
                warn!(draft = %draft.id, "image upload failed, image left unchanged: {err}");
                draft.last_error = Some(err.to_string());
                UploadApplied::Failed(err)
            }
        }
    }

    /// Ticket of the upload still awaited by the live draft.
    pub fn pending_ticket(&self) -> Option<UploadTicket> {
        self.draft
            .as_ref()
            .and_then(|draft| draft.pending_upload.as_ref())
            .map(|pending| pending.ticket)
    }

    pub fn validate(&self) -> Result<Vec<FieldError>, DraftError> {
        self.draft
            .as_ref()
            .map(Draft::validation_errors)
            .ok_or(DraftError::NoDraft)
    }

    /// Destroys the draft; any pending upload result will be ignored.
    pub fn discard(&mut self) -> Option<Draft> {
        self.cancel_upload();
        let draft = self.draft.take();
        if let Some(draft) = &draft {
            debug!(draft = %draft.id, kind = %draft.kind(), "draft discarded");
        }
        draft
    }

    /// Moves the draft to `Saving` and hands out the snapshot to submit.
    pub(crate) fn begin_save(&mut self) -> Result<Draft, DraftError> {
        let draft = self.draft.as_mut().ok_or(DraftError::NoDraft)?;
        draft.ensure_editable()?;
        draft.phase = DraftPhase::Saving;
        Ok(draft.clone())
    }

    /// Back to `Editing` with the failure recorded; all entered data stays.
    pub(crate) fn save_failed(&mut self, message: String) {
        if let Some(draft) = self.draft.as_mut() {
            draft.phase = DraftPhase::Editing;
            draft.last_error = Some(message);
        }
    }

    /// The save was dropped before it settled; editing resumes as is.
    pub(crate) fn save_abandoned(&mut self) {
        if let Some(draft) = self.draft.as_mut() {
            if draft.phase == DraftPhase::Saving {
                debug!(draft = %draft.id, "save abandoned before completion");
                draft.phase = DraftPhase::Editing;
            }
        }
    }

    pub(crate) fn save_succeeded(&mut self) {
        self.cancel_upload();
        self.draft = None;
    }

    fn replace(&mut self, draft: Draft) -> &Draft {
        if let Some(previous) = self.discard() {
            if previous.phase != DraftPhase::Empty {
                warn!(draft = %previous.id, "unsaved draft replaced by a new one");
            }
        }
        debug!(draft = %draft.id, kind = %draft.kind(), source = ?draft.source, "draft opened");
        self.draft.insert(draft)
    }

    fn cancel_upload(&mut self) {
        if let Some(task) = self.upload_task.take() {
            task.abort();
        }
    }
}

impl Drop for DraftFormController {
    fn drop(&mut self) {
        self.cancel_upload();
    }
}

#[cfg(test)]
#[path = "tests/draft_tests.rs"]
mod tests;
