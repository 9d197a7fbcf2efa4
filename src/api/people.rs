// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Worker roster and administrator endpoints.
//!
//! Management requires an administrator holding
//! [`Permission::ManageWorkers`] or [`Permission::ManageAdmins`]. A worker
//! may read their own roster entry.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode
};
use serde::Deserialize;
use validator::Validate;
use workorder_core::{PolicyOperation, Worker};

use super::{ApiResult, CurrentActor, PageQuery, SharedState, Store, require};
use crate::{
    account::{
        Admin, CreateAdminRequest, IdentityProvider, Permission, provision_admin, provision_worker
    },
    error::{ErrInto, Error},
    repository::{
        CreateWorkerRequest, UpdateWorkerRequest, WorkerChanges, WorkerFilter, WorkerRepository
    }
};

/// Query of `GET /workers`.
#[derive(Debug, Default, Deserialize)]
pub struct WorkersQuery {
    pub group_id:      Option<i64>,
    pub skill_rank_id: Option<i64>,
    pub limit:         Option<i64>,
    pub offset:        Option<i64>
}

pub async fn list_workers<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Query(query): Query<WorkersQuery>
) -> ApiResult<Json<Vec<Worker>>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    require(state.store(), &actor, PolicyOperation::List, Permission::ManageWorkers).await?;
    let filter = WorkerFilter {
        group_id:      query.group_id,
        skill_rank_id: query.skill_rank_id
    };
    let page = PageQuery {
        limit:  query.limit,
        offset: query.offset
    };
    let workers = state
        .store()
        .list_workers(&filter, page.page())
        .await
        .err_into()
        .map_err(actor.reject())?;
    Ok(Json(workers))
}

pub async fn create_worker<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Json(request): Json<CreateWorkerRequest>
) -> ApiResult<(StatusCode, Json<Worker>)>
where
    S: Store,
    I: IdentityProvider + 'static
{
    require(state.store(), &actor, PolicyOperation::Create, Permission::ManageWorkers).await?;
    let worker = provision_worker(state.store(), &state.identities, request)
        .await
        .map_err(actor.reject())?;
    Ok((StatusCode::CREATED, Json(worker)))
}

pub async fn get_worker<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<Json<Worker>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    if actor.0.worker_id() != Some(id) {
        require(state.store(), &actor, PolicyOperation::Read, Permission::ManageWorkers).await?;
    }
    let worker = state
        .store()
        .find_worker(id)
        .await
        .err_into()
        .and_then(|w| w.ok_or(Error::WorkerNotFound(id)))
        .map_err(actor.reject())?;
    Ok(Json(worker))
}

pub async fn update_worker<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>,
    Json(request): Json<UpdateWorkerRequest>
) -> ApiResult<Json<Worker>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    require(state.store(), &actor, PolicyOperation::Update, Permission::ManageWorkers).await?;
    let reject = actor.reject();
    if let Err(e) = request.validate() {
        return Err(reject(e.into()));
    }

    let store = state.store();
    let updated = async move {
        let current = store
            .find_worker(id)
            .await
            .err_into()?
            .ok_or(Error::WorkerNotFound(id))?;
        let mut changes = WorkerChanges::from_worker(&current);
        changes.apply(request);
        store
            .update_worker(id, changes)
            .await
            .err_into()?
            .ok_or(Error::WorkerNotFound(id))
    }
    .await
    .map_err(reject)?;
    Ok(Json(updated))
}

pub async fn delete_worker<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<StatusCode>
where
    S: Store,
    I: IdentityProvider + 'static
{
    require(state.store(), &actor, PolicyOperation::Delete, Permission::ManageWorkers).await?;
    let deleted = state
        .store()
        .delete_worker(id)
        .await
        .err_into()
        .map_err(actor.reject())?;
    if !deleted {
        return Err(actor.reject()(Error::WorkerNotFound(id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_worker<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<Json<Worker>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    require(state.store(), &actor, PolicyOperation::Delete, Permission::ManageWorkers).await?;
    let store = state.store();
    let restored = async move {
        if !store.restore_worker(id).await.err_into()? {
            return Err(Error::WorkerNotFound(id));
        }
        store
            .find_worker(id)
            .await
            .err_into()?
            .ok_or(Error::WorkerNotFound(id))
    }
    .await
    .map_err(actor.reject())?;
    Ok(Json(restored))
}

pub async fn create_admin<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Json(request): Json<CreateAdminRequest>
) -> ApiResult<(StatusCode, Json<Admin>)>
where
    S: Store,
    I: IdentityProvider + 'static
{
    require(state.store(), &actor, PolicyOperation::Create, Permission::ManageAdmins).await?;
    let admin = provision_admin(state.store(), &state.identities, request)
        .await
        .map_err(actor.reject())?;
    Ok((StatusCode::CREATED, Json(admin)))
}
