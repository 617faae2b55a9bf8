//! Client core of the content dashboard: drafts, slugs, image uploads and the
//! reconciliation of local lists with the content API.

pub mod api;
pub mod coordinator;
pub mod draft;
pub mod entity;
pub mod error;
pub mod session;
pub mod slug;
pub mod store;
pub mod upload;
pub mod view;

pub use api::{ContentApi, HttpContentApi, DEFAULT_API_URL};
pub use coordinator::{AlwaysConfirm, Confirm, DeleteOutcome, MutationCoordinator, NeverConfirm};
pub use draft::{Draft, DraftFormController, DraftId, DraftPhase, DraftSource, UploadApplied};
pub use entity::{Entity, FieldEdit, Metadata};
pub use error::{
    ApiClientError, DeleteError, DraftError, FormError, LoadError, SaveError, StoreError,
    UploadError, ValidationError,
};
pub use session::{AnonymousSession, AuthClient, Credentials, SessionProvider, StaticSession};
pub use store::EntityStore;
pub use upload::{
    CloudinaryImageHost, ImageFile, ImageHost, ImagePreview, ImageUploadPipeline, MissingImageHost,
    UploadLimits,
};
pub use view::ContentView;

#[cfg(test)]
#[path = "tests/support.rs"]
mod tests_support;
