//! Error taxonomy of the editing workflow. Every error here is recoverable:
//! the affected operation is left retryable and nothing is retried
//! automatically.

use std::{fmt, time::Duration};

use shared::domain::{ContentKind, EntityId};
use thiserror::Error;

/// Failure talking to the content API or the auth endpoints.
#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Unsupported(String),
}

impl From<url::ParseError> for ApiClientError {
    fn from(err: url::ParseError) -> Self {
        ApiClientError::InvalidUrl(err.to_string())
    }
}

impl ApiClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiClientError::Status { status, .. } => Some(*status),
            ApiClientError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

/// A required field, named per content kind when displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    Title,
    Slug,
    Body,
    Stack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub kind: ContentKind,
    pub field: RequiredField,
}

impl FieldError {
    pub fn field_name(&self) -> &'static str {
        match (self.kind, self.field) {
            (ContentKind::Profile, RequiredField::Title) => "name",
            (_, RequiredField::Title) => "title",
            (_, RequiredField::Slug) => "slug",
            (ContentKind::BlogPost, RequiredField::Body) => "content",
            (ContentKind::Project, RequiredField::Body) => "description",
            (ContentKind::Profile, RequiredField::Body) => "bio",
            (_, RequiredField::Stack) => "stack",
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            RequiredField::Slug => f.write_str("slug is empty; the title needs letters or digits"),
            _ => write!(f, "{} is required", self.field_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("please fill all required fields: {}", join_fields(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn contains(&self, field: RequiredField) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::field_name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("image file is empty")]
    Empty,
    #[error("'{0}' is not an image type")]
    UnsupportedType(String),
    #[error("failed to read image file: {0}")]
    Read(String),
    #[error("image upload failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("image host rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("image host response had no secure_url: {0}")]
    MalformedResponse(String),
    #[error("image upload timed out after {0:?}")]
    TimedOut(Duration),
    #[error("image host is not configured")]
    NotConfigured,
}

impl UploadError {
    /// Failures detected before anything is transmitted.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            UploadError::TooLarge { .. }
                | UploadError::Empty
                | UploadError::UnsupportedType(_)
                | UploadError::Read(_)
                | UploadError::NotConfigured
        )
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("an image upload is still in progress; wait for it before saving")]
    UploadInFlight,
    #[error("failed to save {kind}: {source}")]
    Remote {
        kind: ContentKind,
        #[source]
        source: ApiClientError,
    },
    #[error("server returned an unusable {kind}: {reason}")]
    InvalidResponse { kind: ContentKind, reason: String },
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("failed to delete {kind} {id}: {source}")]
    Remote {
        kind: ContentKind,
        id: EntityId,
        #[source]
        source: ApiClientError,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load {kind} list: {source}")]
    Remote {
        kind: ContentKind,
        #[source]
        source: ApiClientError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} has no id and cannot be stored")]
    MissingId(ContentKind),
    #[error("store holds {expected} entities, got a {actual}")]
    KindMismatch {
        expected: ContentKind,
        actual: ContentKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("no draft is open")]
    NoDraft,
    #[error("{field} does not apply to a {kind}")]
    FieldNotApplicable {
        field: &'static str,
        kind: ContentKind,
    },
    #[error("the draft is being saved")]
    SaveInProgress,
    #[error("no {kind} with id {id} is loaded")]
    UnknownEntity { kind: ContentKind, id: EntityId },
    #[error("a {actual} cannot be opened as a {expected}")]
    KindMismatch {
        expected: ContentKind,
        actual: ContentKind,
    },
}

/// Errors of the form-level operations: editing, attaching and saving.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Save(#[from] SaveError),
}
