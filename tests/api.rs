// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header}
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;
use workorder::{
    account::{CreateAdminRequest, Permission, provision_admin},
    api::{ACTOR_IDENTITY, ACTOR_ROLE, ACTOR_WORKER_ID, AppState, router},
    repository::memory::{MemoryIdentities, MemoryStore}
};

struct Harness {
    app:   Router,
    store: MemoryStore,
    admin: Uuid
}

async fn harness(permissions: Vec<Permission>) -> Harness {
    let store = MemoryStore::new();
    let identities = MemoryIdentities::new();
    let admin = provision_admin(&store, &identities, CreateAdminRequest {
        name: "Office".into(),
        email: "office@example.test".into(),
        password: "front-desk-key".into(),
        permissions
    })
    .await
    .unwrap();

    let state = Arc::new(AppState::new(store.clone(), identities));
    Harness {
        app: router(state),
        store,
        admin: admin.identity_id
    }
}

enum As {
    Nobody,
    Admin(Uuid),
    Worker(i64)
}

fn request(method: Method, uri: &str, actor: As, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    match actor {
        As::Nobody => {}
        As::Admin(identity) => {
            builder = builder
                .header(ACTOR_IDENTITY, identity.to_string())
                .header(ACTOR_ROLE, "admin");
        }
        As::Worker(id) => {
            builder = builder
                .header(ACTOR_IDENTITY, Uuid::new_v4().to_string())
                .header(ACTOR_ROLE, "worker")
                .header(ACTOR_WORKER_ID, id.to_string());
        }
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap()
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_owned());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, location, body)
}

fn new_work(worker_id: Option<i64>) -> Value {
    json!({
        "title": "canvas aprons",
        "quantity": 12,
        "unit_price": 80,
        "worker_id": worker_id
    })
}

#[tokio::test]
async fn missing_actor_redirects_to_worker_login() {
    let h = harness(Permission::ALL.to_vec()).await;
    let (status, location, _) = send(&h.app, request(Method::GET, "/works", As::Nobody, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(location.as_deref(), Some("/worker/login"));
}

#[tokio::test]
async fn malformed_admin_headers_redirect_to_admin_login() {
    let h = harness(Permission::ALL.to_vec()).await;
    let req = Request::builder()
        .uri("/works")
        .header(ACTOR_IDENTITY, "not-a-uuid")
        .header(ACTOR_ROLE, "admin")
        .body(Body::empty())
        .unwrap();
    let (status, location, _) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(location.as_deref(), Some("/admin/login"));
}

#[tokio::test]
async fn expired_backend_session_redirects() {
    let h = harness(Permission::ALL.to_vec()).await;
    h.store.fail_next("JWT expired").await;
    let (status, location, _) =
        send(&h.app, request(Method::GET, "/works", As::Admin(h.admin), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(location.as_deref(), Some("/admin/login"));
}

#[tokio::test]
async fn admin_creates_and_lists_works() {
    let h = harness(Permission::ALL.to_vec()).await;
    let (status, location, body) = send(
        &h.app,
        request(Method::POST, "/works", As::Admin(h.admin), Some(new_work(None)))
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(location, None);
    assert_eq!(body["status"], 0);
    assert_eq!(body["cost"], 960);

    let (status, _, body) =
        send(&h.app, request(Method::GET, "/works?status=0", As::Admin(h.admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn invalid_work_is_a_bad_request() {
    let h = harness(Permission::ALL.to_vec()).await;
    let mut work = new_work(None);
    work["quantity"] = json!(0);
    let (status, ..) =
        send(&h.app, request(Method::POST, "/works", As::Admin(h.admin), Some(work))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn workers_cannot_create_works() {
    let h = harness(Permission::ALL.to_vec()).await;
    let (status, location, _) =
        send(&h.app, request(Method::POST, "/works", As::Worker(1), Some(new_work(None)))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(location, None);
}

#[tokio::test]
async fn transition_outside_allow_list_conflicts() {
    let h = harness(Permission::ALL.to_vec()).await;
    let (_, _, work) = send(
        &h.app,
        request(Method::POST, "/works", As::Admin(h.admin), Some(new_work(None)))
    )
    .await;
    let uri = format!("/works/{}/complete", work["id"]);

    let (status, ..) = send(&h.app, request(Method::POST, &uri, As::Admin(h.admin), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn worker_scans_and_starts_a_work() {
    let h = harness(Permission::ALL.to_vec()).await;
    let (status, _, worker) = send(
        &h.app,
        request(
            Method::POST,
            "/workers",
            As::Admin(h.admin),
            Some(json!({
                "name": "Rin",
                "email": "rin@example.test",
                "password": "needle-and-thread"
            }))
        )
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let worker_id = worker["id"].as_i64().unwrap();

    let (_, _, work) = send(
        &h.app,
        request(Method::POST, "/works", As::Admin(h.admin), Some(new_work(Some(worker_id))))
    )
    .await;
    let work_id = work["id"].as_i64().unwrap();

    let (status, _, resolved) = send(
        &h.app,
        request(
            Method::POST,
            "/scan/resolve",
            As::Worker(worker_id),
            Some(json!({ "payload": format!("WorkID:#{work_id}") }))
        )
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["id"], work_id);

    let uri = format!("/works/{work_id}/start");
    let (status, _, started) =
        send(&h.app, request(Method::POST, &uri, As::Worker(worker_id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], 2);
}

#[tokio::test]
async fn garbage_payload_is_a_bad_request() {
    let h = harness(Permission::ALL.to_vec()).await;
    let (status, ..) = send(
        &h.app,
        request(
            Method::POST,
            "/scan/resolve",
            As::Worker(1),
            Some(json!({ "payload": "https://example.test/menu" }))
        )
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_needs_its_permission() {
    let h = harness(vec![Permission::ManageWorks]).await;
    let (status, ..) = send(
        &h.app,
        request(Method::POST, "/groups", As::Admin(h.admin), Some(json!({ "name": "North" })))
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let h = harness(vec![Permission::ManageGroups]).await;
    let (status, _, group) = send(
        &h.app,
        request(Method::POST, "/groups", As::Admin(h.admin), Some(json!({ "name": "North" })))
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/groups/{}", group["id"]);
    let (status, ..) = send(&h.app, request(Method::DELETE, &uri, As::Admin(h.admin), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, ..) = send(&h.app, request(Method::DELETE, &uri, As::Admin(h.admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn works_need_a_registered_admin_with_manage_works() {
    let h = harness(vec![Permission::ManageGroups]).await;
    let (status, location, _) = send(
        &h.app,
        request(Method::POST, "/works", As::Admin(h.admin), Some(new_work(None)))
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(location, None);

    let stranger = Uuid::new_v4();
    let (status, ..) = send(
        &h.app,
        request(Method::POST, "/works", As::Admin(stranger), Some(new_work(None)))
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, ..) = send(&h.app, request(Method::GET, "/works", As::Admin(stranger), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, works) = send(&h.app, request(Method::GET, "/works", As::Worker(1), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(works, json!([]));
}

#[tokio::test]
async fn purged_work_is_gone_for_good() {
    let h = harness(Permission::ALL.to_vec()).await;
    let (_, _, work) = send(
        &h.app,
        request(Method::POST, "/works", As::Admin(h.admin), Some(new_work(None)))
    )
    .await;
    let uri = format!("/works/{}", work["id"]);

    let (status, ..) = send(&h.app, request(Method::DELETE, &uri, As::Admin(h.admin), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, purged) = send(
        &h.app,
        request(Method::POST, &format!("{uri}/purge"), As::Admin(h.admin), None)
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(purged["id"], work["id"]);

    let (status, ..) = send(
        &h.app,
        request(Method::POST, &format!("{uri}/restore"), As::Admin(h.admin), None)
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
