// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! HTTP API.
//!
//! | Path | Methods |
//! |------|---------|
//! | `/works` | `GET` (query `status`, `worker_id`, `limit`, `offset`), `POST` |
//! | `/works/{id}` | `GET`, `PATCH`, `DELETE` |
//! | `/works/{id}/restore` | `POST` |
//! | `/works/{id}/purge` | `POST` (permanent removal) |
//! | `/works/{id}/start` | `POST` (query `worker_id` when an admin acts for a worker) |
//! | `/works/{id}/complete` | `POST` |
//! | `/works/{id}/delivery` | `POST` |
//! | `/scan/resolve` | `POST` |
//! | `/workers` | `GET`, `POST` |
//! | `/workers/{id}` | `GET`, `PATCH`, `DELETE` |
//! | `/workers/{id}/restore` | `POST` |
//! | `/admins` | `POST` |
//! | `/groups`, `/skill-ranks`, `/videos`, `/notification-emails` | `GET`, `POST` |
//! | `.../{id}` on catalog paths | `DELETE` |
//!
//! The caller is identified by headers set by the authenticating gateway:
//! `x-actor-identity` (uuid), `x-actor-role` (`admin` or `worker`) and
//! `x-actor-worker-id` for workers. Missing or malformed headers count as
//! an expired session.
//!
//! Session errors answer `401 Unauthorized` with a `Location` header naming
//! the caller's login screen. Every other error goes through
//! [`masterror::AppError`].

mod catalog;
mod people;
mod works;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
    response::{IntoResponse, Response},
    routing::{delete, get, post}
};
use masterror::AppError;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;
use workorder_core::{Actor, Denied, Pagination, PolicyOperation};

use crate::{
    account::{AdminRepository, IdentityProvider, Permission},
    cache::WorkListCache,
    catalog::{CatalogEntry, CatalogRepository, Group, NotificationEmail, SkillRank, Video},
    error::{Audience, Error},
    repository::{WorkRepository, WorkerRepository},
    service::WorkService
};

/// Header carrying the caller's identity.
pub const ACTOR_IDENTITY: &str = "x-actor-identity";
/// Header carrying the caller's role.
pub const ACTOR_ROLE: &str = "x-actor-role";
/// Header carrying a worker caller's roster id.
pub const ACTOR_WORKER_ID: &str = "x-actor-worker-id";

/// Storage backend usable by the API.
pub trait Store:
    WorkRepository
    + WorkerRepository
    + AdminRepository
    + CatalogRepository<Group>
    + CatalogRepository<SkillRank>
    + CatalogRepository<Video>
    + CatalogRepository<NotificationEmail>
    + 'static
{
}

impl<T> Store for T where
    T: WorkRepository
        + WorkerRepository
        + AdminRepository
        + CatalogRepository<Group>
        + CatalogRepository<SkillRank>
        + CatalogRepository<Video>
        + CatalogRepository<NotificationEmail>
        + 'static
{
}

/// Shared state of the HTTP handlers.
pub struct AppState<S, I> {
    /// Works operations.
    pub works:      WorkService<S>,
    /// Identity provider used when provisioning accounts.
    pub identities: I
}

impl<S, I> AppState<S, I> {
    /// Build state over a store and an identity provider.
    pub fn new(store: S, identities: I) -> Self {
        Self {
            works: WorkService::new(store),
            identities
        }
    }

    /// Serve works listings from `board`.
    pub fn with_board(mut self, board: Arc<WorkListCache<S>>) -> Self {
        self.works = self.works.with_board(board);
        self
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        self.works.repo()
    }
}

type SharedState<S, I> = Arc<AppState<S, I>>;

/// Build the application router.
pub fn router<S, I>(state: Arc<AppState<S, I>>) -> Router
where
    S: Store,
    I: IdentityProvider + 'static
{
    Router::new()
        .route("/works", get(works::list::<S, I>).post(works::create::<S, I>))
        .route(
            "/works/{id}",
            get(works::get::<S, I>)
                .patch(works::update::<S, I>)
                .delete(works::delete::<S, I>)
        )
        .route("/works/{id}/restore", post(works::restore::<S, I>))
        .route("/works/{id}/purge", post(works::purge::<S, I>))
        .route("/works/{id}/start", post(works::start::<S, I>))
        .route("/works/{id}/complete", post(works::complete::<S, I>))
        .route("/works/{id}/delivery", post(works::choose_delivery::<S, I>))
        .route("/scan/resolve", post(works::resolve_scan::<S, I>))
        .route(
            "/workers",
            get(people::list_workers::<S, I>).post(people::create_worker::<S, I>)
        )
        .route(
            "/workers/{id}",
            get(people::get_worker::<S, I>)
                .patch(people::update_worker::<S, I>)
                .delete(people::delete_worker::<S, I>)
        )
        .route("/workers/{id}/restore", post(people::restore_worker::<S, I>))
        .route("/admins", post(people::create_admin::<S, I>))
        .merge(catalog_routes::<S, I, Group>("/groups"))
        .merge(catalog_routes::<S, I, SkillRank>("/skill-ranks"))
        .merge(catalog_routes::<S, I, Video>("/videos"))
        .merge(catalog_routes::<S, I, NotificationEmail>("/notification-emails"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn catalog_routes<S, I, T>(path: &str) -> Router<SharedState<S, I>>
where
    S: Store + CatalogRepository<T>,
    I: IdentityProvider + 'static,
    T: CatalogEntry
{
    Router::new()
        .route(
            path,
            get(catalog::list::<S, I, T>).post(catalog::create::<S, I, T>)
        )
        .route(&format!("{path}/{{id}}"), delete(catalog::delete::<S, I, T>))
}

/// Error response of a handler.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    login: Option<&'static str>
}

/// Result type of handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Convert a crate error for a caller of `audience`.
    pub fn new(error: Error, audience: Audience) -> Self {
        let login = error.login_redirect(audience);
        Self {
            error: error.into(),
            login
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            login: None
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.error.into_response();
        if let Some(login) = self.login {
            info!(login, "session expired, redirecting to login");
            response
                .headers_mut()
                .insert(header::LOCATION, HeaderValue::from_static(login));
        }
        response
    }
}

/// Caller resolved from the gateway headers.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl CurrentActor {
    /// Login audience of the caller.
    pub const fn audience(&self) -> Audience {
        if self.0.is_admin() {
            Audience::Admin
        } else {
            Audience::Worker
        }
    }

    /// Error mapper for this caller.
    pub fn reject(&self) -> impl FnOnce(Error) -> ApiError + use<> {
        let audience = self.audience();
        move |error| ApiError::new(error, audience)
    }

    fn deny(&self, operation: PolicyOperation, reason: &str) -> ApiError {
        ApiError::new(Denied::new(operation, reason).into(), self.audience())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(Self).ok_or_else(|| {
            let audience = match header_str(&parts.headers, ACTOR_ROLE) {
                Some("admin") => Audience::Admin,
                _ => Audience::Worker
            };
            ApiError::new(
                Error::SessionExpired("missing or invalid actor headers".into()),
                audience
            )
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let identity = header_str(headers, ACTOR_IDENTITY)?.parse::<Uuid>().ok()?;
    match header_str(headers, ACTOR_ROLE)? {
        "admin" => Some(Actor::admin(identity)),
        "worker" => {
            let worker_id = header_str(headers, ACTOR_WORKER_ID)?.parse().ok()?;
            Some(Actor::worker(identity, worker_id))
        }
        _ => None
    }
}

/// Require an administrator holding `permission`.
async fn require<S: Store>(
    store: &S,
    actor: &CurrentActor,
    operation: PolicyOperation,
    permission: Permission
) -> ApiResult<()> {
    if !actor.0.is_admin() {
        return Err(actor.deny(operation, "administrators only"));
    }
    let admin = store
        .find_admin_by_identity(actor.0.identity)
        .await
        .map_err(|e| actor.reject()(e.into()))?;
    match admin {
        Some(admin) if admin.can(permission) => Ok(()),
        Some(_) => Err(actor.deny(operation, &format!("missing permission `{permission}`"))),
        None => Err(actor.deny(operation, "unknown administrator"))
    }
}

/// `limit`/`offset` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit:  Option<i64>,
    pub offset: Option<i64>
}

impl PageQuery {
    /// Pagination with defaults for missing values.
    pub fn page(&self) -> Pagination {
        let default = Pagination::default();
        Pagination::new(
            self.limit.unwrap_or(default.limit),
            self.offset.unwrap_or(default.offset)
        )
    }
}
