// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use uuid::Uuid;
use workorder::{
    WorkEvent, WorkService,
    cache::WorkListCache,
    prelude::*,
    repository::{CreateWorkRequest, WorkFilter, memory::MemoryStore},
    subscriber::ChangeFeed
};

fn request(title: &str) -> CreateWorkRequest {
    CreateWorkRequest {
        title: title.into(),
        quantity: 3,
        unit_price: 100,
        worker_id: None,
        delivery_at: None,
        video_id: None
    }
}

#[tokio::test]
async fn feed_reports_every_works_mutation() {
    let store = MemoryStore::new();
    let service = WorkService::new(store.clone());
    let admin = Actor::admin(Uuid::new_v4());
    let mut feed = store.subscribe();

    let work = service.create_work(&admin, request("scarves")).await.unwrap();
    service.delete_work(&admin, work.id).await.unwrap();
    service.restore_work(&admin, work.id).await.unwrap();

    assert!(matches!(feed.recv().await.unwrap(), WorkEvent::Created { entity } if entity.id == work.id));
    assert_eq!(feed.recv().await.unwrap(), WorkEvent::soft_deleted(work.id));
    assert_eq!(feed.recv().await.unwrap(), WorkEvent::restored(work.id));
}

#[tokio::test]
async fn cache_refreshes_after_remote_change() {
    let store = MemoryStore::new();
    let service = WorkService::new(store.clone());
    let admin = Actor::admin(Uuid::new_v4());
    service.create_work(&admin, request("mittens")).await.unwrap();

    let cache = Arc::new(WorkListCache::new(store.clone(), WorkFilter::default()));
    assert_eq!(cache.get().await.unwrap().len(), 1);

    let mut generation = cache.watch();
    let follower = {
        let cache = Arc::clone(&cache);
        let feed = store.subscribe();
        tokio::spawn(async move { cache.follow(feed).await })
    };

    service.create_work(&admin, request("socks")).await.unwrap();
    timeout(Duration::from_secs(1), generation.changed())
        .await
        .unwrap()
        .unwrap();

    let works = cache.get().await.unwrap();
    assert_eq!(works.len(), 2);
    assert_eq!(cache.fetch_count(), 2);

    follower.abort();
}
