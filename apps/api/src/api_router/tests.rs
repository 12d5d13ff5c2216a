use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use patchgate_core::{Domain, Permission, User};
use patchgate_infrastructure::InMemoryEnforcer;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::build_router;
use crate::middleware::{DOMAIN_HEADER, USER_HEADER};
use crate::state::AppState;

const ALICE: &str = "alice";

async fn router_with(grants: &[(Permission, &str)]) -> Router {
    let enforcer = Arc::new(InMemoryEnforcer::new());
    let alice = User::new(ALICE);
    for (permission, resource) in grants {
        enforcer
            .grant(&alice, &Domain::global(), *permission, *resource)
            .await;
    }

    let state = AppState::new(enforcer, Domain::global()).unwrap_or_else(|_| unreachable!());
    build_router(state, 64 * 1024)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_HEADER, ALICE)
        .body(body.map_or_else(Body::empty, |body| Body::from(body.to_string())))
        .unwrap_or_else(|_| unreachable!());

    let response = router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|_| unreachable!());
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|_| unreachable!());

    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn full_access() -> Vec<(Permission, &'static str)> {
    Permission::all()
        .iter()
        .flat_map(|permission| [(*permission, "contacts"), (*permission, "contacts.*")])
        .collect()
}

async fn create_ada(router: &Router) -> u64 {
    let (status, body) = send(
        router,
        Method::POST,
        "/contacts",
        Some(json!({"name": "Ada", "email": "ada@example.com", "age": 36})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    body["id"].as_u64().unwrap_or_else(|| unreachable!())
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let router = router_with(&full_access()).await;
    let request = Request::builder()
        .uri("/contacts/1")
        .header(DOMAIN_HEADER, "global")
        .body(Body::empty())
        .unwrap_or_else(|_| unreachable!());

    let response = router.oneshot(request).await.unwrap_or_else(|_| unreachable!());
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patch_returns_only_changed_fields() {
    let router = router_with(&full_access()).await;
    let id = create_ada(&router).await;

    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/contacts/{id}"),
        Some(json!({"name": "Ada", "age": 37})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changes"], json!({"age": {"old": 36, "new": 37}}));
}

#[tokio::test]
async fn patching_a_gated_field_requires_its_resource() {
    let router = router_with(&[
        (Permission::Create, "contacts"),
        (Permission::Create, "contacts.age"),
        (Permission::Update, "contacts"),
    ])
    .await;
    let id = create_ada(&router).await;

    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/contacts/{id}"),
        Some(json!({"age": 40})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "identity alice lacks update on [contacts.age]"
    );

    let (status, _) = send(
        &router,
        Method::PATCH,
        &format!("/contacts/{id}"),
        Some(json!({"name": "Ada Lovelace"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_and_invalid_fields_are_bad_requests() {
    let router = router_with(&full_access()).await;
    let id = create_ada(&router).await;

    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/contacts/{id}"),
        Some(json!({"phone": "555"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid field in json - phone");

    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/contacts/{id}"),
        Some(json!({"email": "not-an-address"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "failed validating the request");
}

#[tokio::test]
async fn reads_are_projected_to_readable_fields() {
    let router = router_with(&[
        (Permission::Create, "contacts"),
        (Permission::Create, "contacts.age"),
        (Permission::Read, "contacts"),
        (Permission::Read, "contacts.age"),
    ])
    .await;
    let id = create_ada(&router).await;

    let (status, body) = send(&router, Method::GET, &format!("/contacts/{id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"id": id, "name": "Ada", "age": 36, "tags": []})
    );
}

#[tokio::test]
async fn missing_contacts_are_not_found() {
    let router = router_with(&full_access()).await;

    let (status, body) = send(&router, Method::DELETE, "/contacts/42", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "contact 42 not found");
}

#[tokio::test]
async fn batch_applies_operations_in_order() {
    let router = router_with(&full_access()).await;
    let id = create_ada(&router).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/contacts/batch",
        Some(json!([
            {"op": "add", "value": {"name": "Grace", "email": "grace@example.com"}},
            {"op": "patch", "path": format!("/{id}"), "value": {"tags": ["math"]}},
            {"op": "remove", "path": format!("/{id}")}
        ])),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0], json!({"op": "add", "id": id + 1}));
    assert_eq!(
        body[1],
        json!({"op": "patch", "id": id, "changes": {"tags": {"old": [], "new": ["math"]}}})
    );
    assert_eq!(body[2], json!({"op": "remove", "id": id}));

    let (status, _) = send(&router, Method::GET, &format!("/contacts/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_rejects_unsupported_operations() {
    let router = router_with(&full_access()).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/contacts/batch",
        Some(json!([{"op": "replace", "path": "/1", "value": {}}])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "unsupported operation \"replace\"");
}
