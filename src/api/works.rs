// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Works endpoints.
//!
//! Administrators must be registered and hold [`Permission::ManageWorks`]
//! for every route here. Workers are checked by the works policy alone.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode
};
use masterror::AppError;
use serde::Deserialize;
use workorder_core::{Actor, DeliveryMethod, PolicyOperation, Transition, Work, WorkStatus};

use super::{ApiResult, CurrentActor, PageQuery, SharedState, Store, require};
use crate::{
    account::{IdentityProvider, Permission},
    repository::{CreateWorkRequest, UpdateWorkRequest, WorkFilter}
};

/// Query of `GET /works`.
#[derive(Debug, Default, Deserialize)]
pub struct WorksQuery {
    pub status:    Option<WorkStatus>,
    pub worker_id: Option<i64>,
    pub limit:     Option<i64>,
    pub offset:    Option<i64>
}

/// Worker an administrator acts for.
#[derive(Debug, Default, Deserialize)]
pub struct ActingAs {
    pub worker_id: Option<i64>
}

/// Body of `POST /works/{id}/delivery`.
#[derive(Debug, Deserialize)]
pub struct DeliveryRequest {
    pub method:    DeliveryMethod,
    pub worker_id: Option<i64>
}

/// Body of `POST /scan/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub payload: String
}

/// Worker a transition is performed as.
///
/// Workers act as themselves unless they name someone else, which the
/// policy then refuses. Administrators must name the worker.
fn acting_worker(actor: &Actor, requested: Option<i64>) -> ApiResult<i64> {
    requested
        .or(actor.worker_id())
        .ok_or_else(|| AppError::bad_request("worker_id is required").into())
}

async fn admit<S: Store>(
    store: &S,
    actor: &CurrentActor,
    operation: PolicyOperation
) -> ApiResult<()> {
    if actor.0.is_admin() {
        require(store, actor, operation, Permission::ManageWorks).await?;
    }
    Ok(())
}

pub async fn list<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Query(query): Query<WorksQuery>
) -> ApiResult<Json<Vec<Work>>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::List).await?;
    let filter = WorkFilter {
        status:    query.status,
        worker_id: query.worker_id
    };
    let page = PageQuery {
        limit:  query.limit,
        offset: query.offset
    };
    let works = state
        .works
        .list_works(&actor.0, &filter, page.page())
        .await
        .map_err(actor.reject())?;
    Ok(Json(works))
}

pub async fn create<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Json(request): Json<CreateWorkRequest>
) -> ApiResult<(StatusCode, Json<Work>)>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::Create).await?;
    let work = state
        .works
        .create_work(&actor.0, request)
        .await
        .map_err(actor.reject())?;
    Ok((StatusCode::CREATED, Json(work)))
}

pub async fn get<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::Read).await?;
    let work = state.works.get_work(&actor.0, id).await.map_err(actor.reject())?;
    Ok(Json(work))
}

pub async fn update<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>,
    Json(request): Json<UpdateWorkRequest>
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::Update).await?;
    let work = state
        .works
        .update_work(&actor.0, id, request)
        .await
        .map_err(actor.reject())?;
    Ok(Json(work))
}

pub async fn delete<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<StatusCode>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::Delete).await?;
    state.works.delete_work(&actor.0, id).await.map_err(actor.reject())?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::Delete).await?;
    let work = state.works.restore_work(&actor.0, id).await.map_err(actor.reject())?;
    Ok(Json(work))
}

pub async fn purge<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::Delete).await?;
    let work = state.works.purge_work(&actor.0, id).await.map_err(actor.reject())?;
    Ok(Json(work))
}

pub async fn start<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>,
    Query(acting): Query<ActingAs>
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    let transition = Transition::Start {
        worker_id: acting_worker(&actor.0, acting.worker_id)?
    };
    transition_work(&state, actor, id, transition).await
}

pub async fn complete<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    transition_work(&state, actor, id, Transition::Complete).await
}

pub async fn choose_delivery<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>,
    Json(request): Json<DeliveryRequest>
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    let transition = Transition::ChooseDelivery {
        worker_id: acting_worker(&actor.0, request.worker_id)?,
        method:    request.method
    };
    transition_work(&state, actor, id, transition).await
}

pub async fn resolve_scan<S, I>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Json(request): Json<ResolveRequest>
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::Read).await?;
    let work = state
        .works
        .resolve_payload(&actor.0, &request.payload)
        .await
        .map_err(actor.reject())?;
    Ok(Json(work))
}

async fn transition_work<S, I>(
    state: &SharedState<S, I>,
    actor: CurrentActor,
    id: i64,
    transition: Transition
) -> ApiResult<Json<Work>>
where
    S: Store,
    I: IdentityProvider + 'static
{
    admit(state.store(), &actor, PolicyOperation::Transition).await?;
    let work = state
        .works
        .apply_transition(&actor.0, id, transition)
        .await
        .map_err(actor.reject())?;
    Ok(Json(work))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn workers_act_as_themselves_by_default() {
        let me = Actor::worker(Uuid::new_v4(), 3);
        assert_eq!(acting_worker(&me, None).unwrap(), 3);
        assert_eq!(acting_worker(&me, Some(8)).unwrap(), 8);
    }

    #[test]
    fn admins_must_name_a_worker() {
        let admin = Actor::admin(Uuid::new_v4());
        assert!(acting_worker(&admin, None).is_err());
        assert_eq!(acting_worker(&admin, Some(5)).unwrap(), 5);
    }
}
