use super::*;
use crate::{
    draft::DraftFormController,
    entity::FieldEdit,
    error::RequiredField,
    tests_support::{pipeline, png, ApiCall, FakeContentApi, GatedImageHost},
    upload::MissingImageHost,
};

fn stored(id: &str, title: &str) -> Entity {
    let mut entity = Entity::empty(ContentKind::BlogPost);
    entity.id = Some(EntityId::new(id));
    entity.title = title.into();
    entity.slug = crate::slug::generate(title);
    entity.body = "<p>body</p>".into();
    entity
}

fn new_blog_draft(title: &str) -> Draft {
    let (pipeline, _rx) = pipeline(Arc::new(MissingImageHost));
    let mut controller = DraftFormController::new(pipeline);
    controller.open_new(ContentKind::BlogPost);
    controller
        .set_field(FieldEdit::Title(title.into()))
        .expect("title");
    controller
        .set_field(FieldEdit::Body("<p>Hi</p>".into()))
        .expect("body");
    controller
        .set_field(FieldEdit::Tags(vec![" rust ".into(), "".into(), "web".into()]))
        .expect("tags");
    controller.draft().cloned().expect("draft")
}

fn edit_draft(entity: Entity, title: &str) -> Draft {
    let (pipeline, _rx) = pipeline(Arc::new(MissingImageHost));
    let mut controller = DraftFormController::new(pipeline);
    controller.open_existing(entity);
    controller
        .set_field(FieldEdit::Title(title.into()))
        .expect("title");
    controller.draft().cloned().expect("draft")
}

#[tokio::test]
async fn create_inserts_server_copy_at_front() {
    let api = FakeContentApi::new();
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);
    store.load(vec![stored("old", "Old")]).expect("load");

    let saved = coordinator
        .save(&new_blog_draft("My First Post"), &mut store)
        .await
        .expect("save");

    assert_eq!(saved.id, Some(EntityId::new("generated-1")));
    assert_eq!(store.len(), 2);
    assert_eq!(store.as_slice()[0].slug, "my-first-post");

    let calls = api.calls().await;
    let [ApiCall::Create(sent)] = calls.as_slice() else {
        panic!("expected one create, got {calls:?}");
    };
    assert_eq!(sent.id, None);
    assert!(matches!(
        &sent.metadata,
        crate::entity::Metadata::BlogPost(meta) if meta.tags == vec!["rust", "web"]
    ));
}

#[tokio::test]
async fn update_replaces_in_place_and_keeps_locked_slug() {
    let api = FakeContentApi::new();
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);
    store
        .load(vec![stored("a", "First"), stored("b", "Second")])
        .expect("load");

    let draft = edit_draft(stored("b", "Second"), "Second, Revised");
    coordinator.save(&draft, &mut store).await.expect("save");

    assert_eq!(store.len(), 2);
    let updated = &store.as_slice()[1];
    assert_eq!(updated.title, "Second, Revised");
    assert_eq!(updated.slug, "second");
    assert!(matches!(
        api.calls().await.as_slice(),
        [ApiCall::Update(id, _)] if id.as_str() == "b"
    ));
}

#[tokio::test]
async fn server_slug_is_authoritative() {
    let api = FakeContentApi::new();
    *api.server_slug.lock().await = Some("my-first-post-2".into());
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);

    let saved = coordinator
        .save(&new_blog_draft("My First Post"), &mut store)
        .await
        .expect("save");
    assert_eq!(saved.slug, "my-first-post-2");
    assert_eq!(store.as_slice()[0].slug, "my-first-post-2");
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_network() {
    let api = FakeContentApi::new();
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);

    let err = coordinator
        .save(&new_blog_draft("   "), &mut store)
        .await
        .expect_err("invalid");
    assert!(matches!(&err, SaveError::Validation(v) if v.contains(RequiredField::Title)));
    assert!(api.calls().await.is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn failed_save_leaves_store_untouched() {
    let api = FakeContentApi::new();
    api.fail_next(409, "Slug already exists").await;
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);
    store.load(vec![stored("a", "First")]).expect("load");

    let err = coordinator
        .save(&new_blog_draft("First"), &mut store)
        .await
        .expect_err("conflict");
    match err {
        SaveError::Remote { kind, source } => {
            assert_eq!(kind, ContentKind::BlogPost);
            assert_eq!(source.status(), Some(409));
            assert!(source.to_string().contains("Slug already exists"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.len(), 1);
    assert_eq!(store.as_slice()[0].id, Some(EntityId::new("a")));
}

#[tokio::test]
async fn save_waits_for_pending_upload() {
    let host = GatedImageHost::new();
    let _gate = host.gate("cover.png").await;
    let (pipeline, _rx) = pipeline(host.clone());
    let mut controller = DraftFormController::new(pipeline);
    controller.open_new(ContentKind::BlogPost);
    controller
        .set_field(FieldEdit::Title("Post".into()))
        .expect("title");
    controller
        .set_field(FieldEdit::Body("<p>b</p>".into()))
        .expect("body");
    controller.attach_image(png("cover.png", 8)).expect("attach");

    let api = FakeContentApi::new();
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);
    let draft = controller.draft().cloned().expect("draft");
    assert!(matches!(
        coordinator.save(&draft, &mut store).await,
        Err(SaveError::UploadInFlight)
    ));
    assert!(api.calls().await.is_empty());
}

#[tokio::test]
async fn denied_delete_makes_no_request() {
    let api = FakeContentApi::new();
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);
    store.load(vec![stored("a", "First")]).expect("load");

    let outcome = coordinator
        .delete(ContentKind::BlogPost, &EntityId::new("a"), &NeverConfirm, &mut store)
        .await
        .expect("cancelled");
    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(store.len(), 1);
    assert!(api.calls().await.is_empty());
}

#[tokio::test]
async fn confirmed_delete_removes_after_server_ack() {
    let api = FakeContentApi::new();
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);
    store
        .load(vec![stored("a", "First"), stored("b", "Second")])
        .expect("load");

    let outcome = coordinator
        .delete(ContentKind::BlogPost, &EntityId::new("a"), &AlwaysConfirm, &mut store)
        .await
        .expect("deleted");
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(store.len(), 1);
    assert!(store.get(&EntityId::new("a")).is_none());

    api.fail_next(500, "db down").await;
    let err = coordinator
        .delete(ContentKind::BlogPost, &EntityId::new("b"), &AlwaysConfirm, &mut store)
        .await
        .expect_err("remote failure");
    assert!(matches!(err, DeleteError::Remote { ref id, .. } if id.as_str() == "b"));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn load_replaces_store_contents() {
    let api = FakeContentApi::new();
    *api.listing.lock().await = vec![stored("x", "X"), stored("y", "Y"), stored("x", "X again")];
    let coordinator = MutationCoordinator::new(api.clone());
    let mut store = EntityStore::new(ContentKind::BlogPost);
    store.load(vec![stored("old", "Old")]).expect("seed");

    coordinator.load(&mut store, true).await.expect("load");
    let ids: Vec<_> = store
        .iter()
        .filter_map(|entity| entity.id.as_ref().map(EntityId::as_str))
        .collect();
    assert_eq!(ids, vec!["x", "y"]);
    assert_eq!(
        api.calls().await,
        vec![ApiCall::List(ContentKind::BlogPost, true)]
    );

    api.fail_next(503, "unavailable").await;
    assert!(matches!(
        coordinator.load(&mut store, false).await,
        Err(LoadError::Remote { .. })
    ));
    assert_eq!(store.len(), 2);
}
