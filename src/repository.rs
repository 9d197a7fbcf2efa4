// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Repository traits and request DTOs for works and workers.
//!
//! | Trait | Backends |
//! |-------|----------|
//! | [`WorkRepository`] | [`PgPool`](sqlx::PgPool), [`MemoryStore`](memory::MemoryStore) |
//! | [`WorkerRepository`] | [`PgPool`](sqlx::PgPool), [`MemoryStore`](memory::MemoryStore) |
//!
//! Works and workers use soft delete: `delete_*` sets `deleted_at`, lookups
//! and listings skip marked rows, `restore_*` clears the marker.
//!
//! Every works mutation publishes a [`WorkEvent`](crate::events::WorkEvent)
//! on the backend's change feed.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;
use workorder_core::{Pagination, Repository, StatusChange, Work, WorkStatus, Worker};

use crate::error::Error;

/// Storage operations for works.
#[async_trait]
pub trait WorkRepository: Repository<Error: Into<Error>> {
    /// Insert a work.
    async fn insert_work(&self, work: NewWork) -> Result<Work, Self::Error>;

    /// Find a live work by id.
    async fn find_work(&self, id: i64) -> Result<Option<Work>, Self::Error>;

    /// Find a work by id, including soft-deleted ones.
    async fn find_work_with_deleted(&self, id: i64) -> Result<Option<Work>, Self::Error>;

    /// List live works in id order.
    async fn list_works(
        &self,
        filter: &WorkFilter,
        page: Pagination
    ) -> Result<Vec<Work>, Self::Error>;

    /// Overwrite the editable fields of a live work.
    ///
    /// Returns `None` when the work does not exist.
    async fn update_work(&self, id: i64, changes: WorkChanges) -> Result<Option<Work>, Self::Error>;

    /// Apply a guarded status change.
    ///
    /// Updates only while the stored status equals `change.expected` and the
    /// work is live. Returns `None` when the guard did not match.
    async fn apply_status_change(&self, change: &StatusChange) -> Result<Option<Work>, Self::Error>;

    /// Soft-delete a work.
    async fn delete_work(&self, id: i64) -> Result<bool, Self::Error>;

    /// Clear the soft-delete marker.
    async fn restore_work(&self, id: i64) -> Result<bool, Self::Error>;

    /// Permanently remove a work.
    async fn hard_delete_work(&self, id: i64) -> Result<bool, Self::Error>;
}

/// Storage operations for workers.
#[async_trait]
pub trait WorkerRepository: Repository<Error: Into<Error>> {
    /// Insert a worker.
    async fn insert_worker(&self, worker: NewWorker) -> Result<Worker, Self::Error>;

    /// Find a live worker by id.
    async fn find_worker(&self, id: i64) -> Result<Option<Worker>, Self::Error>;

    /// Find the live worker bound to an identity.
    async fn find_worker_by_identity(&self, identity: Uuid) -> Result<Option<Worker>, Self::Error>;

    /// List live workers in id order.
    async fn list_workers(
        &self,
        filter: &WorkerFilter,
        page: Pagination
    ) -> Result<Vec<Worker>, Self::Error>;

    /// Overwrite the editable fields of a live worker.
    async fn update_worker(
        &self,
        id: i64,
        changes: WorkerChanges
    ) -> Result<Option<Worker>, Self::Error>;

    /// Soft-delete a worker.
    async fn delete_worker(&self, id: i64) -> Result<bool, Self::Error>;

    /// Clear the soft-delete marker.
    async fn restore_worker(&self, id: i64) -> Result<bool, Self::Error>;
}

/// Fetch every live work matching `filter`, page by page, in id order.
pub async fn fetch_all_works<R>(repo: &R, filter: &WorkFilter) -> Result<Vec<Work>, R::Error>
where
    R: WorkRepository + ?Sized
{
    let mut works = Vec::new();
    let mut offset = 0;
    loop {
        let batch = repo
            .list_works(filter, Pagination::new(Pagination::MAX_LIMIT, offset))
            .await?;
        let done = (batch.len() as i64) < Pagination::MAX_LIMIT;
        works.extend(batch);
        if done {
            return Ok(works);
        }
        offset += Pagination::MAX_LIMIT;
    }
}

/// Insertable work, with cost already computed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWork {
    pub title:       String,
    pub status:      WorkStatus,
    pub worker_id:   Option<i64>,
    pub quantity:    i32,
    pub unit_price:  i64,
    pub cost:        i64,
    pub delivery_at: Option<DateTime<Utc>>,
    pub video_id:    Option<i64>
}

/// Resolved editable fields of a work.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkChanges {
    pub title:       String,
    pub worker_id:   Option<i64>,
    pub quantity:    i32,
    pub unit_price:  i64,
    pub cost:        i64,
    pub delivery_at: Option<DateTime<Utc>>,
    pub video_id:    Option<i64>
}

impl WorkChanges {
    /// Current editable fields of `work`.
    pub fn from_work(work: &Work) -> Self {
        Self {
            title:       work.title.clone(),
            worker_id:   work.worker_id,
            quantity:    work.quantity,
            unit_price:  work.unit_price,
            cost:        work.cost,
            delivery_at: work.delivery_at,
            video_id:    work.video_id
        }
    }

    /// Apply a partial update request.
    pub fn apply(&mut self, request: UpdateWorkRequest) {
        if let Some(title) = request.title {
            self.title = title;
        }
        if let Some(quantity) = request.quantity {
            self.quantity = quantity;
        }
        if let Some(unit_price) = request.unit_price {
            self.unit_price = unit_price;
        }
        if let Some(worker_id) = request.worker_id {
            self.worker_id = worker_id;
        }
        if let Some(delivery_at) = request.delivery_at {
            self.delivery_at = delivery_at;
        }
        if let Some(video_id) = request.video_id {
            self.video_id = video_id;
        }
    }
}

/// Filter for work listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkFilter {
    /// Only works with this status.
    pub status:    Option<WorkStatus>,
    /// Only works assigned to this worker.
    pub worker_id: Option<i64>
}

impl WorkFilter {
    /// Check whether `work` passes the filter.
    pub fn matches(&self, work: &Work) -> bool {
        self.status.is_none_or(|s| s == work.status)
            && self.worker_id.is_none_or(|w| work.worker_id == Some(w))
    }
}

/// Request to create a work.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWorkRequest {
    #[validate(length(min = 1, max = 200))]
    pub title:       String,
    #[validate(range(min = 1))]
    pub quantity:    i32,
    #[validate(range(min = 0))]
    pub unit_price:  i64,
    pub worker_id:   Option<i64>,
    pub delivery_at: Option<DateTime<Utc>>,
    pub video_id:    Option<i64>
}

/// Partial update of a work.
///
/// Nullable fields distinguish "absent" (`None`) from "set to null"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateWorkRequest {
    #[validate(length(min = 1, max = 200))]
    pub title:       Option<String>,
    #[validate(range(min = 1))]
    pub quantity:    Option<i32>,
    #[validate(range(min = 0))]
    pub unit_price:  Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub worker_id:   Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub delivery_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub video_id:    Option<Option<i64>>
}

/// Insertable worker.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorker {
    pub name:          String,
    pub email:         String,
    pub identity_id:   Uuid,
    pub address:       Option<String>,
    pub birth_date:    Option<NaiveDate>,
    pub next_visit_on: Option<NaiveDate>,
    pub price_ratio:   f64,
    pub group_id:      Option<i64>,
    pub skill_rank_id: Option<i64>
}

/// Resolved editable fields of a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerChanges {
    pub name:          String,
    pub address:       Option<String>,
    pub birth_date:    Option<NaiveDate>,
    pub next_visit_on: Option<NaiveDate>,
    pub price_ratio:   f64,
    pub group_id:      Option<i64>,
    pub skill_rank_id: Option<i64>
}

impl WorkerChanges {
    /// Current editable fields of `worker`.
    pub fn from_worker(worker: &Worker) -> Self {
        Self {
            name:          worker.name.clone(),
            address:       worker.address.clone(),
            birth_date:    worker.birth_date,
            next_visit_on: worker.next_visit_on,
            price_ratio:   worker.price_ratio,
            group_id:      worker.group_id,
            skill_rank_id: worker.skill_rank_id
        }
    }

    /// Apply a partial update request.
    pub fn apply(&mut self, request: UpdateWorkerRequest) {
        if let Some(name) = request.name {
            self.name = name;
        }
        if let Some(price_ratio) = request.price_ratio {
            self.price_ratio = price_ratio;
        }
        if let Some(address) = request.address {
            self.address = address;
        }
        if let Some(birth_date) = request.birth_date {
            self.birth_date = birth_date;
        }
        if let Some(next_visit_on) = request.next_visit_on {
            self.next_visit_on = next_visit_on;
        }
        if let Some(group_id) = request.group_id {
            self.group_id = group_id;
        }
        if let Some(skill_rank_id) = request.skill_rank_id {
            self.skill_rank_id = skill_rank_id;
        }
    }
}

/// Filter for worker listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkerFilter {
    /// Only workers in this group.
    pub group_id:      Option<i64>,
    /// Only workers with this skill rank.
    pub skill_rank_id: Option<i64>
}

impl WorkerFilter {
    /// Check whether `worker` passes the filter.
    pub fn matches(&self, worker: &Worker) -> bool {
        self.group_id.is_none_or(|g| worker.group_id == Some(g))
            && self.skill_rank_id.is_none_or(|s| worker.skill_rank_id == Some(s))
    }
}

/// Request to register a worker together with their login identity.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWorkerRequest {
    #[validate(length(min = 1, max = 100))]
    pub name:          String,
    #[validate(email)]
    pub email:         String,
    #[validate(length(min = 8))]
    pub password:      String,
    pub address:       Option<String>,
    pub birth_date:    Option<NaiveDate>,
    pub next_visit_on: Option<NaiveDate>,
    #[validate(range(min = 0.0, max = 10.0))]
    #[serde(default = "default_price_ratio")]
    pub price_ratio:   f64,
    pub group_id:      Option<i64>,
    pub skill_rank_id: Option<i64>
}

impl CreateWorkerRequest {
    /// Insertable worker bound to `identity_id`.
    pub fn into_new_worker(self, identity_id: Uuid) -> NewWorker {
        NewWorker {
            name: self.name,
            email: self.email,
            identity_id,
            address: self.address,
            birth_date: self.birth_date,
            next_visit_on: self.next_visit_on,
            price_ratio: self.price_ratio,
            group_id: self.group_id,
            skill_rank_id: self.skill_rank_id
        }
    }
}

/// Partial update of a worker.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateWorkerRequest {
    #[validate(length(min = 1, max = 100))]
    pub name:          Option<String>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub price_ratio:   Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub address:       Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub birth_date:    Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub next_visit_on: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub group_id:      Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub skill_rank_id: Option<Option<i64>>
}

const fn default_price_ratio() -> f64 {
    1.0
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let absent: UpdateWorkRequest = serde_json::from_str(r#"{"title":"x"}"#).expect("json");
        assert_eq!(absent.worker_id, None);

        let cleared: UpdateWorkRequest = serde_json::from_str(r#"{"worker_id":null}"#).expect("json");
        assert_eq!(cleared.worker_id, Some(None));

        let set: UpdateWorkRequest = serde_json::from_str(r#"{"worker_id":4}"#).expect("json");
        assert_eq!(set.worker_id, Some(Some(4)));
    }

    #[test]
    fn create_work_validation() {
        let request = CreateWorkRequest {
            title:       String::new(),
            quantity:    0,
            unit_price:  -1,
            worker_id:   None,
            delivery_at: None,
            video_id:    None
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("unit_price"));
    }

    #[test]
    fn create_worker_defaults_ratio_and_checks_email() {
        let request: CreateWorkerRequest =
            serde_json::from_str(r#"{"name":"Aiko","email":"not-an-email","password":"longenough"}"#)
                .expect("json");
        assert_eq!(request.price_ratio, 1.0);
        assert!(request.validate().unwrap_err().field_errors().contains_key("email"));
    }

    #[test]
    fn filter_matches() {
        let filter = WorkerFilter {
            group_id:      Some(2),
            skill_rank_id: None
        };
        let worker = Worker {
            id:            1,
            name:          "Aiko".into(),
            email:         "aiko@example.test".into(),
            identity_id:   Uuid::nil(),
            address:       None,
            birth_date:    None,
            next_visit_on: None,
            price_ratio:   1.0,
            group_id:      Some(2),
            skill_rank_id: Some(1),
            created_at:    Utc::now(),
            deleted_at:    None
        };
        assert!(filter.matches(&worker));
        assert!(!WorkerFilter {
            group_id:      Some(3),
            skill_rank_id: None
        }
        .matches(&worker));
    }
}
