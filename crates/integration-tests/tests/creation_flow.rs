//! The creation step machine wired to a real store and a mocked media
//! store: successful submission, fail-closed validation, and fail-closed
//! transport errors.

use std::sync::Arc;

use bytes::Bytes;

use auth_adapters::StaticIdentity;
use domains::models::Bottle;
use domains::paths::DbPath;
use domains::ports::{MockMediaStore, Store};
use services::bottles::BottleService;
use services::creation::{BottleDraft, CreationFlow, CreationStep};
use storage_adapters::MemoryStore;

use integration_tests as fixtures;

fn bottles(store: &Arc<MemoryStore>, viewer: StaticIdentity) -> BottleService {
    BottleService::new(store.clone(), Arc::new(viewer), fixtures::clock_at(fixtures::NOW))
}

fn advance_to_review(flow: &mut CreationFlow) {
    flow.advance(); // Content
    flow.advance(); // Conditions
    flow.advance(); // Review
    assert_eq!(flow.step(), &CreationStep::Review);
}

#[tokio::test]
async fn submit_uploads_media_and_persists_the_bottle() {
    fixtures::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let bottles = bottles(&store, StaticIdentity::signed_in("owner-1"));

    let mut media = MockMediaStore::new();
    media
        .expect_upload()
        .withf(|_, path, content_type| {
            path.starts_with("bottles/")
                && path.contains("/assets/")
                && content_type == "image/jpeg"
        })
        .returning(|_, path, _| Ok(path.to_string()));

    let mut draft = fixtures::draft();
    draft.image = Some(Bytes::from_static(b"\xff\xd8jpeg"));
    draft.password = Some("kraken".into());

    let mut flow = CreationFlow::new(draft, bottles, Arc::new(media));
    assert_eq!(flow.step(), &CreationStep::LocationConfirm);
    advance_to_review(&mut flow);

    let bottle_id = match flow.submit().await {
        CreationStep::Completed { bottle_id } => bottle_id.clone(),
        other => panic!("expected completion, got {other:?}"),
    };

    let stored = store.get(&DbPath::bottle(&bottle_id)).await.unwrap().unwrap();
    let bottle: Bottle = serde_json::from_value(stored).unwrap();
    assert_eq!(bottle.owner_uid, "owner-1");
    assert!(bottle.status.locked);
    assert_eq!(bottle.conditions.password.as_deref(), Some("kraken"));

    let image_path = bottle.content.image_path.unwrap();
    assert!(image_path.starts_with(&format!("bottles/{bottle_id}/assets/")));
    assert!(image_path.ends_with(".jpg"));
}

#[tokio::test]
async fn submit_is_only_accepted_at_review() {
    fixtures::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let bottles = bottles(&store, StaticIdentity::signed_in("owner-1"));

    let mut flow =
        CreationFlow::new(fixtures::draft(), bottles, Arc::new(MockMediaStore::new()));
    flow.advance();
    assert_eq!(flow.submit().await, &CreationStep::Content);
    assert_eq!(store.get(&DbPath::bottles_root()).await.unwrap(), None);
}

#[tokio::test]
async fn empty_draft_fails_closed() {
    fixtures::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let bottles = bottles(&store, StaticIdentity::signed_in("owner-1"));

    let draft = BottleDraft { created_at: fixtures::NOW, ..Default::default() };
    let mut flow = CreationFlow::new(draft, bottles, Arc::new(MockMediaStore::new()));
    advance_to_review(&mut flow);

    match flow.submit().await {
        CreationStep::Error(message) => {
            assert!(message.contains("text, image, or audio"), "got {message}");
        }
        other => panic!("expected error step, got {other:?}"),
    }
    assert_eq!(store.get(&DbPath::bottles_root()).await.unwrap(), None);
}

#[tokio::test]
async fn failed_upload_fails_closed_without_persisting() {
    fixtures::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let bottles = bottles(&store, StaticIdentity::signed_in("owner-1"));

    let mut media = MockMediaStore::new();
    media
        .expect_upload()
        .returning(|_, _, _| Err(anyhow::anyhow!("bucket offline")));

    let mut draft = fixtures::draft();
    draft.image = Some(Bytes::from_static(b"\xff\xd8jpeg"));

    let mut flow = CreationFlow::new(draft, bottles, Arc::new(media));
    advance_to_review(&mut flow);

    match flow.submit().await {
        CreationStep::Error(message) => {
            assert!(message.contains("media upload failed"), "got {message}");
        }
        other => panic!("expected error step, got {other:?}"),
    }
    assert_eq!(store.get(&DbPath::bottles_root()).await.unwrap(), None);
}

#[tokio::test]
async fn anonymous_creators_are_refused() {
    fixtures::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let bottles = bottles(&store, StaticIdentity::anonymous());

    let mut flow =
        CreationFlow::new(fixtures::draft(), bottles, Arc::new(MockMediaStore::new()));
    advance_to_review(&mut flow);

    match flow.submit().await {
        CreationStep::Error(message) => {
            assert!(message.contains("signed-in"), "got {message}");
        }
        other => panic!("expected error step, got {other:?}"),
    }
}
