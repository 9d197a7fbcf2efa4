// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Sorted works list kept fresh by change events.
//!
//! Any event marks the cached list stale; the next [`WorkListCache::get`]
//! refetches and re-sorts. Events never trigger a fetch by themselves, so a
//! burst of changes costs one reload.
//!
//! The server keeps one unfiltered cache and hands it to
//! [`WorkService::with_board`](crate::service::WorkService::with_board);
//! [`WorkListCache::follow_reconnecting`] keeps it subscribed for the life
//! of the process.

use std::{
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering}
    },
    time::Duration
};

use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};
use workorder_core::{EntityEvent, StreamError, Work, sort_works};

use crate::{
    error::Result,
    events::WorkEvent,
    repository::{WorkFilter, WorkRepository, fetch_all_works},
    subscriber::ChangeFeed
};

const RECONNECT_MIN: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Cached, priority-sorted list of works for one filter.
#[derive(Debug)]
pub struct WorkListCache<R> {
    repo:       R,
    filter:     WorkFilter,
    works:      Mutex<Option<Arc<Vec<Work>>>>,
    stale:      AtomicBool,
    fetches:    AtomicU64,
    generation: watch::Sender<u64>
}

impl<R: WorkRepository> WorkListCache<R> {
    /// Create an empty cache; the first `get` fetches.
    pub fn new(repo: R, filter: WorkFilter) -> Self {
        Self {
            repo,
            filter,
            works: Mutex::new(None),
            stale: AtomicBool::new(true),
            fetches: AtomicU64::new(0),
            generation: watch::Sender::new(0)
        }
    }

    /// Sorted works, refetched if the cache is stale.
    pub async fn get(&self) -> Result<Arc<Vec<Work>>> {
        let mut cached = self.works.lock().await;
        if let Some(works) = cached.as_ref()
            && !self.stale.load(Ordering::Acquire)
        {
            return Ok(Arc::clone(works));
        }

        // Clear before fetching so an event that lands mid-fetch marks the
        // result stale again.
        self.stale.store(false, Ordering::Release);
        let fetched = match fetch_all_works(&self.repo, &self.filter).await {
            Ok(works) => works,
            Err(e) => {
                self.stale.store(true, Ordering::Release);
                return Err(e.into());
            }
        };
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(count = fetched.len(), "works list refetched");

        let works = Arc::new(sort_works(&fetched));
        *cached = Some(Arc::clone(&works));
        Ok(works)
    }

    /// Mark the list stale.
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
        self.generation.send_modify(|g| *g += 1);
    }

    /// React to a change event.
    pub fn observe(&self, event: &WorkEvent) {
        debug!(kind = ?event.kind(), id = event.entity_id(), "works list invalidated");
        self.invalidate();
    }

    /// Number of invalidations so far.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Receiver that changes on every invalidation.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Number of fetches performed.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Invalidate on every event from `feed` until it fails.
    ///
    /// Missed events and undecodable payloads also invalidate. Returns the
    /// error that ended the feed.
    pub async fn follow<F: ChangeFeed>(&self, mut feed: F) -> StreamError<F::Error> {
        loop {
            match feed.recv().await {
                Ok(event) => self.observe(&event),
                Err(StreamError::Lagged(missed)) => {
                    warn!(missed, "works feed lagged");
                    self.invalidate();
                }
                Err(StreamError::Deserialize(e)) => {
                    warn!(error = %e, "undecodable works event");
                    self.invalidate();
                }
                Err(e) => return e
            }
        }
    }

    /// Follow feeds opened by `connect` until one closes.
    ///
    /// A failed feed is reopened after a delay that doubles up to
    /// `RECONNECT_MAX`. Events sent while disconnected are lost, so every
    /// feed loss also invalidates.
    pub async fn follow_reconnecting<F, C, Fut, E>(&self, mut connect: C)
    where
        F: ChangeFeed,
        C: FnMut() -> Fut,
        Fut: Future<Output = Result<F, E>>,
        E: Display
    {
        let mut delay = RECONNECT_MIN;
        loop {
            match connect().await {
                Ok(feed) => {
                    delay = RECONNECT_MIN;
                    let e = self.follow(feed).await;
                    self.invalidate();
                    if e.is_closed() {
                        debug!("works feed closed");
                        return;
                    }
                    warn!(error = %e, retry_in = ?delay, "works feed lost");
                }
                Err(e) => warn!(error = %e, retry_in = ?delay, "works feed unavailable")
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(RECONNECT_MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, future, io};

    use async_trait::async_trait;
    use tokio::time::Instant;
    use workorder_core::WorkStatus;

    use super::*;
    use crate::repository::{NewWork, memory::MemoryStore};

    struct ScriptedFeed(VecDeque<Result<WorkEvent, StreamError<io::Error>>>);

    #[async_trait]
    impl ChangeFeed for ScriptedFeed {
        type Error = io::Error;

        async fn recv(&mut self) -> Result<WorkEvent, StreamError<io::Error>> {
            self.0.pop_front().unwrap_or(Err(StreamError::Closed))
        }
    }

    fn new_work(title: &str, status: WorkStatus) -> NewWork {
        NewWork {
            title: title.into(),
            status,
            worker_id: None,
            quantity: 1,
            unit_price: 100,
            cost: 100,
            delivery_at: None,
            video_id: None
        }
    }

    #[tokio::test]
    async fn serves_from_cache_until_invalidated() {
        let store = MemoryStore::new();
        store
            .insert_work(new_work("planned", WorkStatus::RequestPlanned))
            .await
            .unwrap();
        store
            .insert_work(new_work("running", WorkStatus::InProgress))
            .await
            .unwrap();
        let cache = WorkListCache::new(store.clone(), WorkFilter::default());

        let first = cache.get().await.unwrap();
        assert_eq!(first[0].title, "running");
        cache.get().await.unwrap();
        assert_eq!(cache.fetch_count(), 1);

        cache.invalidate();
        assert_eq!(cache.generation(), 1);
        cache.get().await.unwrap();
        assert_eq!(cache.fetch_count(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_stays_stale() {
        let store = MemoryStore::new();
        let cache = WorkListCache::new(store.clone(), WorkFilter::default());

        store.fail_next("connection reset").await;
        assert!(cache.get().await.is_err());
        assert!(cache.get().await.unwrap().is_empty());
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_feed_is_reopened_after_a_delay() {
        let cache = WorkListCache::new(MemoryStore::new(), WorkFilter::default());
        let started = Instant::now();
        let mut attempts = 0;

        cache
            .follow_reconnecting(|| {
                attempts += 1;
                future::ready(match attempts {
                    1 => Err(io::Error::other("connection refused")),
                    2 => Ok(ScriptedFeed(VecDeque::from([Err(StreamError::Database(
                        io::Error::other("connection reset")
                    ))]))),
                    _ => Ok(ScriptedFeed(VecDeque::from([Ok(WorkEvent::soft_deleted(1))])))
                })
            })
            .await;

        assert_eq!(attempts, 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(3));
        // Lost feed, event, closed feed.
        assert_eq!(cache.generation(), 3);
    }
}
