// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Works operations with policy checks.
//!
//! [`WorkService`] is the single entry point for reading and changing works.
//! Every operation asks the [`WorkPolicy`] first, then talks to storage.
//! Status transitions are committed as one guarded update: if the stored
//! status moved after the check, the commit fails with
//! [`Error::StaleStatus`] and nothing is written.
//!
//! With a board attached ([`WorkService::with_board`]) listings are served
//! from a [`WorkListCache`] of all live works instead of storage.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use validator::Validate;
use workorder_core::{
    Actor, EntityCommand, Pagination, Transition, Work, WorkStatus, compute_cost, parse_payload,
    sort_works
};

use crate::{
    cache::WorkListCache,
    error::{ErrInto, Error, Result},
    policy::{RolePolicy, WorkPolicy},
    repository::{
        CreateWorkRequest, NewWork, UpdateWorkRequest, WorkChanges, WorkFilter, WorkRepository,
        WorkerRepository, fetch_all_works
    },
    scan::ScanSession
};

/// Works operations over a storage backend.
#[derive(Debug, Clone)]
pub struct WorkService<R, P = RolePolicy> {
    repo:   R,
    policy: P,
    board:  Option<Arc<WorkListCache<R>>>
}

impl<R> WorkService<R> {
    /// Service with the default role policy.
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, RolePolicy)
    }
}

impl<R, P> WorkService<R, P> {
    /// Service with a custom policy.
    pub fn with_policy(repo: R, policy: P) -> Self {
        Self {
            repo,
            policy,
            board: None
        }
    }

    /// Serve listings from `board`, which must cache every live work.
    pub fn with_board(mut self, board: Arc<WorkListCache<R>>) -> Self {
        self.board = Some(board);
        self
    }

    /// Underlying store.
    pub fn repo(&self) -> &R {
        &self.repo
    }
}

impl<R, P> WorkService<R, P>
where
    R: WorkRepository + WorkerRepository,
    P: WorkPolicy
{
    /// Create a work; cost uses the assigned worker's price ratio.
    ///
    /// Works with a worker start as `RequestPlanned`, others as
    /// `Requesting`.
    pub async fn create_work(&self, actor: &Actor, request: CreateWorkRequest) -> Result<Work> {
        self.policy.can_create(&request, actor).await?;
        request.validate()?;

        let ratio = self.price_ratio(request.worker_id).await?;
        let status = if request.worker_id.is_some() {
            WorkStatus::RequestPlanned
        } else {
            WorkStatus::Requesting
        };
        let work = NewWork {
            cost: compute_cost(request.quantity, request.unit_price, ratio),
            title: request.title,
            status,
            worker_id: request.worker_id,
            quantity: request.quantity,
            unit_price: request.unit_price,
            delivery_at: request.delivery_at,
            video_id: request.video_id
        };

        let work = self.repo.insert_work(work).await.err_into()?;
        info!(work_id = work.id, cost = work.cost, "work created");
        Ok(work)
    }

    /// Update editable fields and recompute the cost.
    pub async fn update_work(
        &self,
        actor: &Actor,
        id: i64,
        request: UpdateWorkRequest
    ) -> Result<Work> {
        self.policy.can_update(id, &request, actor).await?;
        request.validate()?;

        let current = self.find(id).await?;
        let mut changes = WorkChanges::from_work(&current);
        changes.apply(request);
        let ratio = self.price_ratio(changes.worker_id).await?;
        changes.cost = compute_cost(changes.quantity, changes.unit_price, ratio);

        self.repo
            .update_work(id, changes)
            .await
            .err_into()?
            .ok_or(Error::WorkNotFound(id))
    }

    /// Fetch one live work.
    pub async fn get_work(&self, actor: &Actor, id: i64) -> Result<Work> {
        let work = self.find(id).await?;
        self.policy.can_read(&work, actor).await?;
        Ok(work)
    }

    /// Soft-delete a work.
    pub async fn delete_work(&self, actor: &Actor, id: i64) -> Result<()> {
        self.policy.can_delete(id, actor).await?;
        if !self.repo.delete_work(id).await.err_into()? {
            return Err(Error::WorkNotFound(id));
        }
        info!(work_id = id, "work deleted");
        Ok(())
    }

    /// Undo a soft delete.
    pub async fn restore_work(&self, actor: &Actor, id: i64) -> Result<Work> {
        self.policy.can_delete(id, actor).await?;
        if !self.repo.restore_work(id).await.err_into()? {
            return Err(Error::WorkNotFound(id));
        }
        info!(work_id = id, "work restored");
        self.find(id).await
    }

    /// Permanently remove a work, live or soft-deleted.
    ///
    /// Returns the record as it was before removal.
    pub async fn purge_work(&self, actor: &Actor, id: i64) -> Result<Work> {
        self.policy.can_delete(id, actor).await?;
        let work = self
            .repo
            .find_work_with_deleted(id)
            .await
            .err_into()?
            .ok_or(Error::WorkNotFound(id))?;
        if !self.repo.hard_delete_work(id).await.err_into()? {
            return Err(Error::WorkNotFound(id));
        }
        info!(work_id = id, was_deleted = work.is_deleted(), "work purged");
        Ok(work)
    }

    /// Works visible to the actor, in display order.
    ///
    /// Pagination applies after sorting, so pages follow the display order.
    pub async fn list_works(
        &self,
        actor: &Actor,
        filter: &WorkFilter,
        page: Pagination
    ) -> Result<Vec<Work>> {
        let filter = self.policy.can_list(filter, actor).await?;
        let sorted: Vec<Work> = match &self.board {
            Some(board) => board
                .get()
                .await?
                .iter()
                .filter(|w| filter.matches(w))
                .cloned()
                .collect(),
            None => sort_works(&fetch_all_works(&self.repo, &filter).await.err_into()?)
        };

        Ok(sorted
            .into_iter()
            .enumerate()
            .filter(|(i, _)| page.contains(*i as i64))
            .map(|(_, work)| work)
            .collect())
    }

    /// Look up the work a QR payload names, without changing it.
    pub async fn resolve_payload(&self, actor: &Actor, payload: &str) -> Result<Work> {
        let id = parse_payload(payload)?;
        self.get_work(actor, id).await
    }

    /// Apply a status transition to a work.
    pub async fn apply_transition(
        &self,
        actor: &Actor,
        id: i64,
        transition: Transition
    ) -> Result<Work> {
        self.policy.can_transition(&transition, actor).await?;
        let work = self.find(id).await?;

        let change = match transition.check(&work, Utc::now()) {
            Ok(change) => change,
            Err(e) => {
                info!(work_id = id, error = %e, "transition rejected");
                return Err(e.into());
            }
        };

        match self.repo.apply_status_change(&change).await.err_into()? {
            Some(updated) => {
                info!(
                    work_id = id,
                    command = transition.name(),
                    kind = ?transition.kind(),
                    from = %change.expected,
                    to = %updated.status,
                    "transition committed"
                );
                Ok(updated)
            }
            None => {
                warn!(work_id = id, expected = %change.expected, "work changed before commit");
                Err(Error::StaleStatus(id))
            }
        }
    }

    /// Confirm a detected scan and commit `transition` for it.
    ///
    /// The outcome is recorded in the session either way.
    pub async fn commit_scan(
        &self,
        session: &mut ScanSession,
        transition: Transition,
        actor: &Actor
    ) -> Result<Work> {
        let work_id = session.confirm()?;
        let outcome = self.apply_transition(actor, work_id, transition).await;
        session.finish(&outcome)?;
        outcome
    }

    async fn find(&self, id: i64) -> Result<Work> {
        self.repo
            .find_work(id)
            .await
            .err_into()?
            .ok_or(Error::WorkNotFound(id))
    }

    async fn price_ratio(&self, worker_id: Option<i64>) -> Result<f64> {
        let Some(worker_id) = worker_id else {
            return Ok(1.0);
        };
        let worker = WorkerRepository::find_worker(&self.repo, worker_id)
            .await
            .err_into()?
            .ok_or(Error::WorkerNotFound(worker_id))?;
        Ok(worker.price_ratio)
    }
}
