//! End-to-end contribution lifecycle: guest submission, bulk moderation and a
//! live wall kept in sync through the change feed

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use memento_common::db::init_memory_database;
use memento_common::events::FeedError;
use memento_common::{
    ChangeFeed, ContributionKind, ContributionStatus, ContributionStore, EventDirectory, EventSettings, EventStatus,
    NewEvent, SortOrder, SqliteStore,
};
use memento_server::display::LiveDisplay;
use memento_server::moderation::{BulkAction, ModerationBoard, ModerationController};
use memento_server::reconcile::ViewChange;
use memento_server::storage::{LocalMediaStorage, MediaStorage};
use memento_server::validation::{validate, Submission};
use tempfile::TempDir;

const HOST: &str = "host-anna";

struct World {
    store: SqliteStore,
    media: Arc<dyn MediaStorage>,
    _media_dir: TempDir,
}

async fn world(feed_capacity: usize) -> World {
    let pool = init_memory_database().await.unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    World {
        store: SqliteStore::new(pool, ChangeFeed::new(feed_capacity)),
        media: Arc::new(LocalMediaStorage::new(media_dir.path().to_path_buf(), "event-media")),
        _media_dir: media_dir,
    }
}

fn new_event() -> NewEvent {
    NewEvent {
        title: "Anna & Ben".to_string(),
        description: None,
        event_date: Utc::now(),
        settings: EventSettings::default(),
        status: EventStatus::Active,
    }
}

fn text(guest: &str, message: &str) -> Submission {
    Submission {
        guest_name: guest.to_string(),
        kind: Some(ContributionKind::Text),
        text_content: Some(message.to_string()),
        ..Default::default()
    }
}

fn photo(guest: &str, url: &str) -> Submission {
    Submission {
        guest_name: guest.to_string(),
        kind: Some(ContributionKind::Photo),
        content_url: Some(url.to_string()),
        mime_type: Some("image/jpeg".to_string()),
        ..Default::default()
    }
}

impl World {
    async fn controller(&self, event_id: uuid::Uuid) -> ModerationController {
        let store: Arc<dyn ContributionStore> = Arc::new(self.store.clone());
        ModerationController::open(&self.store, store, self.media.clone(), event_id, HOST)
            .await
            .unwrap()
    }

    async fn approved(&self, event_id: uuid::Uuid) -> Vec<memento_common::Contribution> {
        self.store
            .list(event_id, Some(ContributionStatus::Approved), SortOrder::Descending)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_guest_to_wall_lifecycle() {
    let w = world(64).await;
    let event = w.store.create_event(HOST, new_event()).await.unwrap();

    let mut wall = LiveDisplay::new(w.approved(event.id).await, Duration::from_secs(8));
    let mut subscription = w.store.feed().subscribe(event.id);
    assert!(wall.is_empty());
    assert_eq!(wall.index(), None);

    // Guests submit; pending items never reach the wall
    let message = w
        .store
        .create(validate(&event, &text("Ann", "Congratulations!"), w.media.as_ref()).unwrap())
        .await
        .unwrap();
    let cake = photo("Ben", &format!("{}/cake.jpg", event.id));
    let picture = w
        .store
        .create(validate(&event, &cake, w.media.as_ref()).unwrap())
        .await
        .unwrap();
    assert_eq!(message.status, ContributionStatus::Pending);
    for _ in 0..2 {
        let change = subscription.recv().await.unwrap();
        assert_eq!(wall.apply(&change), ViewChange::Unchanged);
    }

    // Host approves both at once; apply optimistically, then the echoes
    let controller = w.controller(event.id).await;
    let report = controller.bulk(&[message.id, picture.id], BulkAction::Approve).await;
    assert!(report.is_complete());
    assert_eq!(report.applied, 2);
    for change in &report.changes {
        wall.apply(change);
    }
    assert_eq!(wall.len(), 2);
    for _ in 0..2 {
        let echo = subscription.recv().await.unwrap();
        assert!(matches!(wall.apply(&echo), ViewChange::Replaced { .. }));
    }
    assert_eq!(wall.len(), 2);
    assert_eq!(wall.items()[0].id, picture.id);

    // Wall state matches the store
    let ids: Vec<_> = wall.items().iter().map(|c| c.id).collect();
    let stored: Vec<_> = w.approved(event.id).await.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), stored.len());
    for id in &stored {
        assert!(ids.contains(id));
    }

    // The first approved slide stayed on screen as the second one arrived
    assert_eq!(wall.index(), Some(1));
    assert_eq!(wall.current().map(|c| c.id), Some(message.id));

    // Withdraw the last slide while it is showing; the index is clamped
    let shown = wall.current().unwrap().id;
    let change = controller.withdraw(shown).await.unwrap();
    wall.apply(&change);
    assert_eq!(wall.len(), 1);
    assert_eq!(wall.index(), Some(0));

    // Restored items come back
    let change = controller.restore(shown).await.unwrap();
    wall.apply(&change);
    assert_eq!(wall.len(), 2);

    // Deleting everything leaves an explicit empty state
    let report = controller.bulk(&[message.id, picture.id], BulkAction::Delete).await;
    assert!(report.is_complete());
    for change in &report.changes {
        wall.apply(change);
    }
    assert!(wall.is_empty());
    assert_eq!(wall.index(), None);
    assert!(w.store.get(message.id).await.is_err());
}

#[tokio::test]
async fn test_bulk_isolates_failures() {
    let w = world(64).await;
    let event = w.store.create_event(HOST, new_event()).await.unwrap();
    let other = w.store.create_event(HOST, new_event()).await.unwrap();

    let ours = w
        .store
        .create(validate(&event, &text("Ann", "Hi"), w.media.as_ref()).unwrap())
        .await
        .unwrap();
    let theirs = w
        .store
        .create(validate(&other, &text("Ben", "Hello"), w.media.as_ref()).unwrap())
        .await
        .unwrap();

    let controller = w.controller(event.id).await;
    let report = controller
        .bulk(&[ours.id, theirs.id, ours.id], BulkAction::Reject)
        .await;
    assert_eq!(report.total, 2);
    assert_eq!(report.applied, 1);
    assert_eq!(report.failed, vec![theirs.id]);
    assert!(report.clone().into_result().is_err());

    assert_eq!(w.store.get(ours.id).await.unwrap().status, ContributionStatus::Rejected);
    assert_eq!(w.store.get(theirs.id).await.unwrap().status, ContributionStatus::Pending);
}

#[tokio::test]
async fn test_board_selection_follows_feed() {
    let w = world(64).await;
    let event = w.store.create_event(HOST, new_event()).await.unwrap();
    let a = w.store.create(validate(&event, &text("Ann", "A"), w.media.as_ref()).unwrap()).await.unwrap();
    let b = w.store.create(validate(&event, &text("Ben", "B"), w.media.as_ref()).unwrap()).await.unwrap();

    let mut board = ModerationBoard::new(w.store.list(event.id, None, SortOrder::Descending).await.unwrap());
    let mut subscription = w.store.feed().subscribe(event.id);
    board.select_all();
    assert_eq!(board.selected(), vec![b.id, a.id]);

    let controller = w.controller(event.id).await;
    controller.approve(a.id).await.unwrap();
    board.apply(&subscription.recv().await.unwrap());

    assert_eq!(board.selected(), vec![b.id]);
    let partition = board.partition();
    assert_eq!(partition.pending.len(), 1);
    assert_eq!(partition.approved.len(), 1);
}

#[tokio::test]
async fn test_lagging_wall_resyncs_from_store() {
    let w = world(2).await;
    let event = w.store.create_event(HOST, new_event()).await.unwrap();
    let mut settings = EventSettings::default();
    settings.auto_approve = true;
    let event = w.store.update_settings(event.id, settings).await.unwrap();

    let mut wall = LiveDisplay::new(Vec::new(), Duration::from_secs(8));
    let mut subscription = w.store.feed().subscribe(event.id);

    for i in 0..5 {
        w.store
            .create(validate(&event, &text("Guest", &format!("Message {}", i)), w.media.as_ref()).unwrap())
            .await
            .unwrap();
    }

    match subscription.recv().await {
        Err(FeedError::Lagged(missed)) => assert_eq!(missed, 3),
        other => panic!("expected lag, got {:?}", other),
    }
    wall.resync(w.approved(event.id).await);
    assert_eq!(wall.len(), 5);

    // Buffered changes that follow are already reflected
    let change = subscription.recv().await.unwrap();
    assert_eq!(wall.apply(&change), ViewChange::Unchanged);
}
