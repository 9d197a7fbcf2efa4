// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! In-process storage backend.
//!
//! [`MemoryStore`] implements every repository trait over maps guarded by a
//! `tokio::sync::RwLock` and publishes works events on a broadcast channel.
//! It backs tests and local runs without a database.
//!
//! [`MemoryStore::fail_next`] makes the next operation fail with a chosen
//! backend message, which lets tests drive session expiry and provisioning
//! compensation.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock, broadcast};
use uuid::Uuid;
use workorder_core::{Pagination, Repository, StatusChange, Work, Worker};

use super::{
    NewWork, NewWorker, WorkChanges, WorkFilter, WorkRepository, WorkerChanges, WorkerFilter,
    WorkerRepository
};
use crate::{
    account::{Admin, AdminRepository, IdentityProvider, NewAdmin},
    catalog::{CatalogEntry, CatalogRepository, Group, NotificationEmail, SkillRank, Video},
    error::Error,
    events::WorkEvent,
    subscriber::MemorySubscriber
};

const EVENT_CAPACITY: usize = 256;

/// Error of the in-memory backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// Failure scheduled with `fail_next`.
    #[error("{0}")]
    Injected(String),

    /// Unique constraint violated.
    #[error("duplicate key value violates unique constraint \"{0}\"")]
    Duplicate(&'static str)
}

impl From<MemoryError> for Error {
    fn from(err: MemoryError) -> Self {
        Error::from_backend(err.to_string())
    }
}

#[derive(Default)]
struct State {
    next_id:             i64,
    works:               BTreeMap<i64, Work>,
    workers:             BTreeMap<i64, Worker>,
    admins:              BTreeMap<i64, Admin>,
    groups:              BTreeMap<i64, Group>,
    skill_ranks:         BTreeMap<i64, SkillRank>,
    videos:              BTreeMap<i64, Video>,
    notification_emails: BTreeMap<i64, NotificationEmail>,
    failure:             Option<String>
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&mut self) -> Result<(), MemoryError> {
        match self.failure.take() {
            Some(message) => Err(MemoryError::Injected(message)),
            None => Ok(())
        }
    }
}

struct Inner {
    state:  RwLock<State>,
    events: broadcast::Sender<WorkEvent>
}

/// In-memory implementation of every repository trait.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                events
            })
        }
    }

    /// Make the next repository call fail with `message`.
    pub async fn fail_next(&self, message: impl Into<String>) {
        self.inner.state.write().await.failure = Some(message.into());
    }

    /// Subscribe to works events.
    pub fn subscribe(&self) -> MemorySubscriber {
        MemorySubscriber::new(self.inner.events.subscribe())
    }

    fn publish(&self, event: WorkEvent) {
        // No receivers is not an error.
        let _ = self.inner.events.send(event);
    }
}

impl Repository for MemoryStore {
    type Error = MemoryError;
    type Pool = Self;

    fn pool(&self) -> &Self::Pool {
        self
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    items
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl WorkRepository for MemoryStore {
    async fn insert_work(&self, work: NewWork) -> Result<Work, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let now = Utc::now();
        let work = Work {
            id:              state.next_id(),
            title:           work.title,
            status:          work.status,
            worker_id:       work.worker_id,
            quantity:        work.quantity,
            unit_price:      work.unit_price,
            cost:            work.cost,
            delivery_at:     work.delivery_at,
            delivered_at:    None,
            delivery_method: None,
            video_id:        work.video_id,
            created_at:      now,
            updated_at:      now,
            deleted_at:      None
        };
        state.works.insert(work.id, work.clone());
        drop(state);

        self.publish(WorkEvent::created(work.clone()));
        Ok(work)
    }

    async fn find_work(&self, id: i64) -> Result<Option<Work>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        Ok(state.works.get(&id).filter(|w| !w.is_deleted()).cloned())
    }

    async fn find_work_with_deleted(&self, id: i64) -> Result<Option<Work>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        Ok(state.works.get(&id).cloned())
    }

    async fn list_works(
        &self,
        filter: &WorkFilter,
        pagination: Pagination
    ) -> Result<Vec<Work>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let live = state
            .works
            .values()
            .filter(|w| !w.is_deleted() && filter.matches(w))
            .cloned();
        Ok(page(live, pagination))
    }

    async fn update_work(&self, id: i64, changes: WorkChanges) -> Result<Option<Work>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let Some(work) = state.works.get_mut(&id).filter(|w| !w.is_deleted()) else {
            return Ok(None);
        };
        let old = work.clone();
        work.title = changes.title;
        work.worker_id = changes.worker_id;
        work.quantity = changes.quantity;
        work.unit_price = changes.unit_price;
        work.cost = changes.cost;
        work.delivery_at = changes.delivery_at;
        work.video_id = changes.video_id;
        work.updated_at = Utc::now();
        let new = work.clone();
        drop(state);

        self.publish(WorkEvent::updated(old, new.clone()));
        Ok(Some(new))
    }

    async fn apply_status_change(&self, change: &StatusChange) -> Result<Option<Work>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let Some(work) = state
            .works
            .get_mut(&change.work_id)
            .filter(|w| !w.is_deleted() && w.status == change.expected)
        else {
            return Ok(None);
        };
        let old = work.clone();
        work.status = change.status;
        work.worker_id = change.worker_id;
        work.delivery_method = change.delivery_method;
        work.delivered_at = change.delivered_at;
        work.updated_at = Utc::now();
        let new = work.clone();
        drop(state);

        self.publish(WorkEvent::updated(old, new.clone()));
        Ok(Some(new))
    }

    async fn delete_work(&self, id: i64) -> Result<bool, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let Some(work) = state.works.get_mut(&id).filter(|w| !w.is_deleted()) else {
            return Ok(false);
        };
        work.deleted_at = Some(Utc::now());
        drop(state);

        self.publish(WorkEvent::soft_deleted(id));
        Ok(true)
    }

    async fn restore_work(&self, id: i64) -> Result<bool, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let Some(work) = state.works.get_mut(&id).filter(|w| w.is_deleted()) else {
            return Ok(false);
        };
        work.deleted_at = None;
        drop(state);

        self.publish(WorkEvent::restored(id));
        Ok(true)
    }

    async fn hard_delete_work(&self, id: i64) -> Result<bool, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let removed = state.works.remove(&id).is_some();
        drop(state);

        if removed {
            self.publish(WorkEvent::hard_deleted(id));
        }
        Ok(removed)
    }
}

#[async_trait]
impl WorkerRepository for MemoryStore {
    async fn insert_worker(&self, worker: NewWorker) -> Result<Worker, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        if state.workers.values().any(|w| w.email == worker.email) {
            return Err(MemoryError::Duplicate("workers_email_key"));
        }
        let worker = Worker {
            id:            state.next_id(),
            name:          worker.name,
            email:         worker.email,
            identity_id:   worker.identity_id,
            address:       worker.address,
            birth_date:    worker.birth_date,
            next_visit_on: worker.next_visit_on,
            price_ratio:   worker.price_ratio,
            group_id:      worker.group_id,
            skill_rank_id: worker.skill_rank_id,
            created_at:    Utc::now(),
            deleted_at:    None
        };
        state.workers.insert(worker.id, worker.clone());
        Ok(worker)
    }

    async fn find_worker(&self, id: i64) -> Result<Option<Worker>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        Ok(state.workers.get(&id).filter(|w| w.deleted_at.is_none()).cloned())
    }

    async fn find_worker_by_identity(&self, identity: Uuid) -> Result<Option<Worker>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        Ok(state
            .workers
            .values()
            .find(|w| w.identity_id == identity && w.deleted_at.is_none())
            .cloned())
    }

    async fn list_workers(
        &self,
        filter: &WorkerFilter,
        pagination: Pagination
    ) -> Result<Vec<Worker>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let live = state
            .workers
            .values()
            .filter(|w| w.deleted_at.is_none() && filter.matches(w))
            .cloned();
        Ok(page(live, pagination))
    }

    async fn update_worker(
        &self,
        id: i64,
        changes: WorkerChanges
    ) -> Result<Option<Worker>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let Some(worker) = state.workers.get_mut(&id).filter(|w| w.deleted_at.is_none()) else {
            return Ok(None);
        };
        worker.name = changes.name;
        worker.address = changes.address;
        worker.birth_date = changes.birth_date;
        worker.next_visit_on = changes.next_visit_on;
        worker.price_ratio = changes.price_ratio;
        worker.group_id = changes.group_id;
        worker.skill_rank_id = changes.skill_rank_id;
        Ok(Some(worker.clone()))
    }

    async fn delete_worker(&self, id: i64) -> Result<bool, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let Some(worker) = state.workers.get_mut(&id).filter(|w| w.deleted_at.is_none()) else {
            return Ok(false);
        };
        worker.deleted_at = Some(Utc::now());
        Ok(true)
    }

    async fn restore_worker(&self, id: i64) -> Result<bool, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        let Some(worker) = state.workers.get_mut(&id).filter(|w| w.deleted_at.is_some()) else {
            return Ok(false);
        };
        worker.deleted_at = None;
        Ok(true)
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        if state.admins.values().any(|a| a.email == admin.email) {
            return Err(MemoryError::Duplicate("admins_email_key"));
        }
        let admin = Admin {
            id:          state.next_id(),
            identity_id: admin.identity_id,
            name:        admin.name,
            email:       admin.email,
            permissions: admin.permissions,
            created_at:  Utc::now()
        };
        state.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn find_admin_by_identity(&self, identity: Uuid) -> Result<Option<Admin>, MemoryError> {
        let mut state = self.inner.state.write().await;
        state.check()?;
        Ok(state
            .admins
            .values()
            .find(|a| a.identity_id == identity)
            .cloned())
    }
}

macro_rules! memory_catalog {
    ($entry:ty, $field:ident) => {
        #[async_trait]
        impl CatalogRepository<$entry> for MemoryStore {
            async fn list_entries(&self, pagination: Pagination) -> Result<Vec<$entry>, MemoryError> {
                let mut state = self.inner.state.write().await;
                state.check()?;
                Ok(page(state.$field.values().cloned(), pagination))
            }

            async fn insert_entry(
                &self,
                create: <$entry as CatalogEntry>::Create
            ) -> Result<$entry, MemoryError> {
                let mut state = self.inner.state.write().await;
                state.check()?;
                let entry = <$entry>::build(state.next_id(), create);
                state.$field.insert(entry.id(), entry.clone());
                Ok(entry)
            }

            async fn delete_entry(&self, id: i64) -> Result<bool, MemoryError> {
                let mut state = self.inner.state.write().await;
                state.check()?;
                Ok(state.$field.remove(&id).is_some())
            }
        }
    };
}

memory_catalog!(Group, groups);
memory_catalog!(SkillRank, skill_ranks);
memory_catalog!(Video, videos);
memory_catalog!(NotificationEmail, notification_emails);

#[derive(Default)]
struct IdentityState {
    accounts:     HashMap<Uuid, String>,
    fail_create:  Option<String>,
    fail_delete:  Option<String>,
    delete_calls: usize
}

/// In-memory identity provider.
#[derive(Clone, Default)]
pub struct MemoryIdentities {
    state: Arc<Mutex<IdentityState>>
}

impl MemoryIdentities {
    /// Create a provider with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if an identity exists.
    pub async fn contains(&self, identity: Uuid) -> bool {
        self.state.lock().await.accounts.contains_key(&identity)
    }

    /// Number of identities.
    pub async fn len(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    /// Check if no identity exists.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of `delete_identity` calls so far.
    pub async fn delete_calls(&self) -> usize {
        self.state.lock().await.delete_calls
    }

    /// Make the next `create_identity` fail with `message`.
    pub async fn fail_next_create(&self, message: impl Into<String>) {
        self.state.lock().await.fail_create = Some(message.into());
    }

    /// Make the next `delete_identity` fail with `message`.
    pub async fn fail_next_delete(&self, message: impl Into<String>) {
        self.state.lock().await.fail_delete = Some(message.into());
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentities {
    type Error = MemoryError;

    async fn create_identity(&self, email: &str, _password: &str) -> Result<Uuid, MemoryError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.fail_create.take() {
            return Err(MemoryError::Injected(message));
        }
        if state.accounts.values().any(|e| e == email) {
            return Err(MemoryError::Duplicate("identities_email_key"));
        }
        let identity = Uuid::new_v4();
        state.accounts.insert(identity, email.to_owned());
        Ok(identity)
    }

    async fn delete_identity(&self, identity: Uuid) -> Result<(), MemoryError> {
        let mut state = self.state.lock().await;
        state.delete_calls += 1;
        if let Some(message) = state.fail_delete.take() {
            return Err(MemoryError::Injected(message));
        }
        state.accounts.remove(&identity);
        Ok(())
    }
}
