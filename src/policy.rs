// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Authorization policy for works.
//!
//! | Operation | Admin | Worker |
//! |-----------|-------|--------|
//! | create, update, delete, restore | yes | no |
//! | read | yes | own or unclaimed works |
//! | list | everything | own works only |
//! | start, choose delivery | on a worker's behalf | as themselves |
//! | complete | yes | no |
//!
//! Workers scan to start a work and to pick its delivery method. Completion
//! is scanned at the office, so [`Transition::Complete`] is refused for
//! workers even on their own works.

use async_trait::async_trait;
use workorder_core::{Actor, Denied, PolicyOperation, Transition, Work};

use crate::repository::{CreateWorkRequest, UpdateWorkRequest, WorkFilter};

/// Authorization policy trait for works.
#[async_trait]
pub trait WorkPolicy: Send + Sync {
    /// Check if create operation is allowed.
    async fn can_create(&self, dto: &CreateWorkRequest, actor: &Actor) -> Result<(), Denied>;

    /// Check if `work` may be read.
    async fn can_read(&self, work: &Work, actor: &Actor) -> Result<(), Denied>;

    /// Check if update operation is allowed.
    async fn can_update(&self, id: i64, dto: &UpdateWorkRequest, actor: &Actor) -> Result<(), Denied>;

    /// Check if delete and restore are allowed.
    async fn can_delete(&self, id: i64, actor: &Actor) -> Result<(), Denied>;

    /// Check a listing and return the filter scoped to the actor.
    async fn can_list(&self, filter: &WorkFilter, actor: &Actor) -> Result<WorkFilter, Denied>;

    /// Check if the actor may request `transition`.
    ///
    /// Status allow-lists are enforced separately at commit.
    async fn can_transition(&self, transition: &Transition, actor: &Actor) -> Result<(), Denied>;
}

/// Default role-based policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

fn admin_only(operation: PolicyOperation, actor: &Actor) -> Result<(), Denied> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(Denied::new(operation, "administrators only"))
    }
}

#[async_trait]
impl WorkPolicy for RolePolicy {
    async fn can_create(&self, _dto: &CreateWorkRequest, actor: &Actor) -> Result<(), Denied> {
        admin_only(PolicyOperation::Create, actor)
    }

    async fn can_read(&self, work: &Work, actor: &Actor) -> Result<(), Denied> {
        match actor.worker_id() {
            None => Ok(()),
            Some(own) if work.other_claimant(own).is_none() => Ok(()),
            Some(_) => Err(Denied::new(
                PolicyOperation::Read,
                "work is assigned to another worker"
            ))
        }
    }

    async fn can_update(
        &self,
        _id: i64,
        _dto: &UpdateWorkRequest,
        actor: &Actor
    ) -> Result<(), Denied> {
        admin_only(PolicyOperation::Update, actor)
    }

    async fn can_delete(&self, _id: i64, actor: &Actor) -> Result<(), Denied> {
        admin_only(PolicyOperation::Delete, actor)
    }

    async fn can_list(&self, filter: &WorkFilter, actor: &Actor) -> Result<WorkFilter, Denied> {
        match actor.worker_id() {
            None => Ok(filter.clone()),
            Some(own) if filter.worker_id.is_none_or(|w| w == own) => Ok(WorkFilter {
                status:    filter.status,
                worker_id: Some(own)
            }),
            Some(_) => Err(Denied::new(
                PolicyOperation::List,
                "workers may only list their own works"
            ))
        }
    }

    async fn can_transition(&self, transition: &Transition, actor: &Actor) -> Result<(), Denied> {
        let named = match *transition {
            Transition::Complete => return admin_only(PolicyOperation::Transition, actor),
            Transition::Start {
                worker_id
            }
            | Transition::ChooseDelivery {
                worker_id, ..
            } => worker_id
        };
        match actor.worker_id() {
            None => Ok(()),
            Some(own) if own == named => Ok(()),
            Some(_) => Err(Denied::new(
                PolicyOperation::Transition,
                "workers may only act as themselves"
            ))
        }
    }
}
