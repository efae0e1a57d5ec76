//! Integration tests for work item dispatch.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::*;
use starfeed::credentials::CredentialSelector;
use starfeed::github::{CommitObject, ObjectKind};
use starfeed::sync::{AbortReason, SyncOptions, SyncOutcome};
use starfeed::worker::{Engine, WorkItem};
use tokio::sync::mpsc;

fn engine(
    store: Arc<starfeed::DbStore>,
    factory: Arc<FakeFactory>,
    publisher: Arc<RecordingPublisher>,
) -> Engine {
    let selector = CredentialSelector::new(store.clone(), factory, Some(app_credential()));
    Engine::new(store, Arc::new(selector), publisher, SyncOptions::default())
}

#[tokio::test]
async fn test_handle_without_client_does_nothing() {
    let (db, store) = setup_store().await;
    seed_user(&db, 1, "alice", "gho_alice").await;
    let factory = Arc::new(FakeFactory::default().with_client("app", Ok(10)));
    let publisher = Arc::new(RecordingPublisher::default());

    let outcome = engine(store, factory.clone(), publisher)
        .handle(&WorkItem::SyncStarredRepos { user_id: 1 })
        .await
        .expect("handle");

    assert_eq!(outcome, SyncOutcome::Aborted(AbortReason::NoClient));
    assert_eq!(factory.client("app").calls().starred, 0);
}

#[tokio::test]
async fn test_handle_dispatches_both_item_kinds() {
    let (db, store) = setup_store().await;
    seed_user(&db, 1, "alice", "gho_alice").await;
    let factory = Arc::new(FakeFactory::default().with_client("app", Ok(5000)));
    let app = factory.client("app");
    app.push_starred_page(vec![remote_repo(42, "octo/app")]);
    app.set_tags(Ok(vec![tag("v1", "sha-v1", ObjectKind::Commit)]));
    app.add_commit(
        "sha-v1",
        CommitObject {
            author: signature(Utc::now()),
            message: "first".to_string(),
        },
    );
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = engine(store, factory, publisher.clone());

    let stars = engine
        .handle(&WorkItem::SyncStarredRepos { user_id: 1 })
        .await
        .expect("stars");
    let versions = engine
        .handle(&WorkItem::SyncVersion { repo_id: 42 })
        .await
        .expect("versions");

    assert_eq!(stars, SyncOutcome::Completed(1));
    assert_eq!(versions, SyncOutcome::Completed(1));
    assert_eq!(publisher.pings(), vec![vec![42]]);
    assert_eq!(star_pairs(&db).await, vec![(1, 42)]);
}

#[tokio::test]
async fn test_run_queue_drains_channel() {
    let (db, store) = setup_store().await;
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        seed_user(&db, id, name, "").await;
    }
    let factory = Arc::new(FakeFactory::default().with_client("app", Ok(5000)));
    let engine = engine(store, factory, Arc::new(RecordingPublisher::default()));

    let (tx, rx) = mpsc::channel(8);
    for user_id in [1, 2, 3, 99] {
        tx.send(WorkItem::SyncStarredRepos { user_id })
            .await
            .expect("send");
    }
    drop(tx);

    let stats = engine.run_queue(rx, 2).await;

    // Three users with empty listings, one unknown user.
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.aborted, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.total(), 4);
}
