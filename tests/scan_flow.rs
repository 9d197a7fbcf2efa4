// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;
use uuid::Uuid;
use workorder::{
    Error, WorkService,
    config::ScanConfig,
    prelude::*,
    repository::{
        CreateWorkRequest, NewWork, NewWorker, WorkChanges, WorkFilter, WorkRepository,
        WorkerChanges, WorkerFilter, WorkerRepository,
        memory::{MemoryError, MemoryStore}
    },
    scan::{FrameOutcome, ScanSession, ScanState}
};

async fn worker(store: &MemoryStore, name: &str) -> i64 {
    store
        .insert_worker(NewWorker {
            name:          name.into(),
            email:         format!("{name}@example.test"),
            identity_id:   Uuid::new_v4(),
            address:       None,
            birth_date:    None,
            next_visit_on: None,
            price_ratio:   1.0,
            group_id:      None,
            skill_rank_id: None
        })
        .await
        .unwrap()
        .id
}

async fn planned_work(service: &WorkService<MemoryStore>, worker_id: Option<i64>) -> Work {
    service
        .create_work(&Actor::admin(Uuid::new_v4()), CreateWorkRequest {
            title: "tote bags".into(),
            quantity: 20,
            unit_price: 50,
            worker_id,
            delivery_at: None,
            video_id: None
        })
        .await
        .unwrap()
}

fn detect(session: &mut ScanSession, work: &Work) {
    let payload = encode_payload(work.id);
    assert_eq!(
        session.offer_frame(&payload, Instant::now()),
        FrameOutcome::Detected(work.id)
    );
}

#[tokio::test]
async fn scan_confirm_commit_starts_the_work() {
    let store = MemoryStore::new();
    let service = WorkService::new(store.clone());
    let me = worker(&store, "aiko").await;
    let work = planned_work(&service, Some(me)).await;
    let actor = Actor::worker(Uuid::new_v4(), me);

    let mut session = ScanSession::new(ScanConfig::default());
    detect(&mut session, &work);

    let started = service
        .commit_scan(&mut session, Transition::Start {
            worker_id: me
        }, &actor)
        .await
        .unwrap();
    assert_eq!(started.status, WorkStatus::InProgress);
    assert_eq!(started.worker_id, Some(me));
    assert_eq!(
        *session.state(),
        ScanState::Committed {
            work_id: work.id,
            status:  WorkStatus::InProgress
        }
    );
}

#[tokio::test]
async fn unclaimed_work_is_claimed_on_start() {
    let store = MemoryStore::new();
    let service = WorkService::new(store.clone());
    let me = worker(&store, "ren").await;
    let work = planned_work(&service, None).await;
    assert_eq!(work.status, WorkStatus::Requesting);

    let mut session = ScanSession::new(ScanConfig::default());
    detect(&mut session, &work);
    let started = service
        .commit_scan(&mut session, Transition::Start {
            worker_id: me
        }, &Actor::worker(Uuid::new_v4(), me))
        .await
        .unwrap();
    assert_eq!(started.worker_id, Some(me));
}

#[tokio::test]
async fn work_claimed_by_someone_else_is_rejected() {
    let store = MemoryStore::new();
    let service = WorkService::new(store.clone());
    let owner = worker(&store, "sora").await;
    let other = worker(&store, "yui").await;
    let work = planned_work(&service, Some(owner)).await;

    let mut session = ScanSession::new(ScanConfig::default());
    detect(&mut session, &work);
    let err = service
        .commit_scan(&mut session, Transition::Start {
            worker_id: other
        }, &Actor::worker(Uuid::new_v4(), other))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Transition(TransitionError::ClaimedByOther {
            claimant, ..
        }) if claimant == owner
    ));
    assert!(matches!(session.state(), ScanState::Rejected { .. }));

    let stored = store.find_work(work.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkStatus::RequestPlanned);
    assert_eq!(stored.worker_id, Some(owner));
}

#[tokio::test]
async fn second_scan_of_a_started_work_changes_nothing() {
    let store = MemoryStore::new();
    let service = WorkService::new(store.clone());
    let me = worker(&store, "hana").await;
    let work = planned_work(&service, Some(me)).await;
    let actor = Actor::worker(Uuid::new_v4(), me);
    let start = Transition::Start {
        worker_id: me
    };

    let mut first = ScanSession::new(ScanConfig::default());
    let mut second = ScanSession::new(ScanConfig::default());
    detect(&mut first, &work);
    detect(&mut second, &work);

    service.commit_scan(&mut first, start, &actor).await.unwrap();
    let err = service.commit_scan(&mut second, start, &actor).await.unwrap_err();
    assert!(matches!(err, Error::Transition(TransitionError::NotAllowed { .. })));

    second.rescan().unwrap();
    assert_eq!(*second.state(), ScanState::Scanning);
}

#[tokio::test]
async fn commit_requires_a_confirmed_detection() {
    let service = WorkService::new(MemoryStore::new());
    let mut session = ScanSession::new(ScanConfig::default());
    let err = service
        .commit_scan(&mut session, Transition::Complete, &Actor::admin(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidScanState { .. }));
    assert_eq!(*session.state(), ScanState::Scanning);
}

#[tokio::test]
async fn stale_status_guard_refuses_the_write() {
    let store = MemoryStore::new();
    let service = WorkService::new(store.clone());
    let me = worker(&store, "kei").await;
    let work = planned_work(&service, Some(me)).await;

    let change = Transition::Start {
        worker_id: me
    }
    .check(&work, Utc::now())
    .unwrap();
    service
        .apply_transition(&Actor::admin(Uuid::new_v4()), work.id, Transition::Start {
            worker_id: me
        })
        .await
        .unwrap();

    assert_eq!(store.apply_status_change(&change).await.unwrap(), None);
}

#[tokio::test]
async fn full_lifecycle_through_delivery() {
    let store = MemoryStore::new();
    let service = WorkService::new(store.clone());
    let me = worker(&store, "nao").await;
    let work = planned_work(&service, Some(me)).await;
    let actor = Actor::worker(Uuid::new_v4(), me);
    let admin = Actor::admin(Uuid::new_v4());

    service
        .apply_transition(&actor, work.id, Transition::Start {
            worker_id: me
        })
        .await
        .unwrap();
    let picked = service
        .apply_transition(&actor, work.id, Transition::ChooseDelivery {
            worker_id: me,
            method:    DeliveryMethod::Pickup
        })
        .await
        .unwrap();
    assert_eq!(picked.status, WorkStatus::PickupRequesting);

    let mut session = ScanSession::new(ScanConfig::default());
    detect(&mut session, &work);
    let done = service
        .commit_scan(&mut session, Transition::Complete, &admin)
        .await
        .unwrap();
    assert_eq!(done.status, WorkStatus::Completed);
    assert!(done.delivered_at.is_some());
}

/// Store where another device commits the same change just before ours.
struct RivalCommit {
    inner: MemoryStore
}

impl Repository for RivalCommit {
    type Error = MemoryError;
    type Pool = MemoryStore;

    fn pool(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl WorkRepository for RivalCommit {
    async fn insert_work(&self, work: NewWork) -> Result<Work, MemoryError> {
        self.inner.insert_work(work).await
    }

    async fn find_work(&self, id: i64) -> Result<Option<Work>, MemoryError> {
        self.inner.find_work(id).await
    }

    async fn find_work_with_deleted(&self, id: i64) -> Result<Option<Work>, MemoryError> {
        self.inner.find_work_with_deleted(id).await
    }

    async fn list_works(
        &self,
        filter: &WorkFilter,
        page: Pagination
    ) -> Result<Vec<Work>, MemoryError> {
        self.inner.list_works(filter, page).await
    }

    async fn update_work(&self, id: i64, changes: WorkChanges) -> Result<Option<Work>, MemoryError> {
        self.inner.update_work(id, changes).await
    }

    async fn apply_status_change(&self, change: &StatusChange) -> Result<Option<Work>, MemoryError> {
        self.inner.apply_status_change(change).await?;
        self.inner.apply_status_change(change).await
    }

    async fn delete_work(&self, id: i64) -> Result<bool, MemoryError> {
        self.inner.delete_work(id).await
    }

    async fn restore_work(&self, id: i64) -> Result<bool, MemoryError> {
        self.inner.restore_work(id).await
    }

    async fn hard_delete_work(&self, id: i64) -> Result<bool, MemoryError> {
        self.inner.hard_delete_work(id).await
    }
}

#[async_trait]
impl WorkerRepository for RivalCommit {
    async fn insert_worker(&self, worker: NewWorker) -> Result<Worker, MemoryError> {
        self.inner.insert_worker(worker).await
    }

    async fn find_worker(&self, id: i64) -> Result<Option<Worker>, MemoryError> {
        self.inner.find_worker(id).await
    }

    async fn find_worker_by_identity(&self, identity: Uuid) -> Result<Option<Worker>, MemoryError> {
        self.inner.find_worker_by_identity(identity).await
    }

    async fn list_workers(
        &self,
        filter: &WorkerFilter,
        page: Pagination
    ) -> Result<Vec<Worker>, MemoryError> {
        self.inner.list_workers(filter, page).await
    }

    async fn update_worker(
        &self,
        id: i64,
        changes: WorkerChanges
    ) -> Result<Option<Worker>, MemoryError> {
        self.inner.update_worker(id, changes).await
    }

    async fn delete_worker(&self, id: i64) -> Result<bool, MemoryError> {
        self.inner.delete_worker(id).await
    }

    async fn restore_worker(&self, id: i64) -> Result<bool, MemoryError> {
        self.inner.restore_worker(id).await
    }
}

#[tokio::test]
async fn status_moved_before_commit_rejects_the_scan() {
    let store = MemoryStore::new();
    let me = worker(&store, "sora").await;
    let work = planned_work(&WorkService::new(store.clone()), Some(me)).await;
    let service = WorkService::new(RivalCommit {
        inner: store.clone()
    });

    let mut session = ScanSession::new(ScanConfig::default());
    detect(&mut session, &work);
    let err = service
        .commit_scan(&mut session, Transition::Start {
            worker_id: me
        }, &Actor::worker(Uuid::new_v4(), me))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StaleStatus(id) if id == work.id));
    assert!(matches!(session.state(), ScanState::Rejected { work_id, .. } if *work_id == work.id));
    let stored = store.find_work(work.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkStatus::InProgress);
}
