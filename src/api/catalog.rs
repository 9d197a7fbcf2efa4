// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Catalog endpoints, shared by every [`CatalogEntry`] type.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode
};
use validator::Validate;
use workorder_core::PolicyOperation;

use super::{ApiResult, CurrentActor, PageQuery, SharedState, Store, require};
use crate::{
    account::IdentityProvider,
    catalog::{CatalogEntry, CatalogRepository},
    error::{ErrInto, Error}
};

pub async fn list<S, I, T>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Query(page): Query<PageQuery>
) -> ApiResult<Json<Vec<T>>>
where
    S: Store + CatalogRepository<T>,
    I: IdentityProvider + 'static,
    T: CatalogEntry
{
    require(state.store(), &actor, PolicyOperation::List, T::PERMISSION).await?;
    let entries = CatalogRepository::<T>::list_entries(state.store(), page.page())
        .await
        .err_into()
        .map_err(actor.reject())?;
    Ok(Json(entries))
}

pub async fn create<S, I, T>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Json(create): Json<T::Create>
) -> ApiResult<(StatusCode, Json<T>)>
where
    S: Store + CatalogRepository<T>,
    I: IdentityProvider + 'static,
    T: CatalogEntry
{
    require(state.store(), &actor, PolicyOperation::Create, T::PERMISSION).await?;
    create.validate().map_err(|e| actor.reject()(e.into()))?;
    let entry = CatalogRepository::<T>::insert_entry(state.store(), create)
        .await
        .err_into()
        .map_err(actor.reject())?;
    tracing::info!(kind = T::KIND, id = entry.id(), "catalog entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn delete<S, I, T>(
    State(state): State<SharedState<S, I>>,
    actor: CurrentActor,
    Path(id): Path<i64>
) -> ApiResult<StatusCode>
where
    S: Store + CatalogRepository<T>,
    I: IdentityProvider + 'static,
    T: CatalogEntry
{
    require(state.store(), &actor, PolicyOperation::Delete, T::PERMISSION).await?;
    let deleted = CatalogRepository::<T>::delete_entry(state.store(), id)
        .await
        .err_into()
        .map_err(actor.reject())?;
    if !deleted {
        return Err(actor.reject()(Error::NotFound {
            kind: T::KIND,
            id
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}
