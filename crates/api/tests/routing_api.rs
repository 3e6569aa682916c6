//! HTTP-level tests for product and sample routing: the happy path through
//! production, optimistic version checks, holder enforcement and the inbox.

mod common;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::Router;
use common::{
    body_json, delete_auth, get_auth, post_json_auth, put_json_auth, seed_cast,
    seed_order_with_product,
};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn transition(
    app: &Router,
    uri: &str,
    token: &str,
    action: &str,
    destination: Option<&str>,
    expected_version: i64,
) -> Response<Body> {
    post_json_auth(
        app.clone(),
        uri,
        json!({
            "action": action,
            "destination": destination,
            "expected_version": expected_version,
        }),
        token,
    )
    .await
}

/// Apply a product transition that must succeed; returns the response data.
async fn step(
    app: &Router,
    product_id: i64,
    token: &str,
    action: &str,
    destination: Option<&str>,
    version: &mut i64,
) -> Value {
    let uri = format!("/api/v1/products/{product_id}/transition");
    let response = transition(app, &uri, token, action, destination, *version).await;
    assert_eq!(response.status(), StatusCode::OK, "{action} should succeed");
    let data = body_json(response).await["data"].clone();
    *version = data["product"]["version"].as_i64().unwrap();
    data
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_routing_view_lists_allowed_actions(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let uri = format!("/api/v1/products/{product_id}/routing");

    let admin_view = body_json(get_auth(app.clone(), &uri, &cast.admin.token).await).await["data"].clone();
    assert_eq!(admin_view["holder"], "admin");
    assert_eq!(admin_view["status"], "pending");
    assert_eq!(admin_view["locked"], false);
    let actions = admin_view["allowed_actions"].as_array().unwrap();
    assert!(actions.contains(&json!({ "action": "route", "destination": "manufacturer" })));
    assert!(actions.contains(&json!({ "action": "route", "destination": "client" })));

    // The manufacturer can see the product but holds nothing.
    let maker_view = body_json(get_auth(app, &uri, &cast.maker.token).await).await["data"].clone();
    assert!(maker_view["allowed_actions"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_product_flow_through_completion(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (order_id, product_id) = seed_order_with_product(&app, &cast).await;
    let mut version = 1;

    let data = step(&app, product_id, &cast.admin.token, "route", Some("client"), &mut version).await;
    assert_eq!(data["product"]["routed_to"], "client");
    assert_eq!(data["product"]["product_status"], "sent_to_client");

    let response = get_auth(app.clone(), "/api/v1/inbox", &cast.client.token).await;
    let inbox = body_json(response).await["data"].clone();
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["entity"], "product");
    assert_eq!(inbox[0]["item_id"], product_id);

    step(&app, product_id, &cast.client.token, "approve", None, &mut version).await;
    let data = step(&app, product_id, &cast.admin.token, "approve", None, &mut version).await;
    assert_eq!(data["product"]["product_status"], "approved");
    assert_eq!(data["product"]["is_locked"], true);

    // Locked products refuse descriptive edits.
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/products/{product_id}"),
        json!({ "name": "Renamed" }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let data = step(&app, product_id, &cast.admin.token, "route", Some("manufacturer"), &mut version).await;
    assert_eq!(data["product"]["product_status"], "ready_for_production");

    let data = step(&app, product_id, &cast.maker.token, "start_production", None, &mut version).await;
    assert_eq!(data["product"]["product_status"], "in_production");
    assert_eq!(data["order_status"], "in_progress");

    let data = step(&app, product_id, &cast.maker.token, "ship", None, &mut version).await;
    assert_eq!(data["product"]["routed_to"], "admin");
    assert_eq!(data["product"]["product_status"], "shipped");

    let data = step(&app, product_id, &cast.admin.token, "complete", None, &mut version).await;
    assert_eq!(data["product"]["product_status"], "completed");

    // Completed products leave the admin's inbox; the pending sample stays.
    let response = get_auth(app.clone(), "/api/v1/inbox", &cast.admin.token).await;
    let inbox = body_json(response).await["data"].clone();
    let entries = inbox.as_array().unwrap();
    assert!(!entries.iter().any(|e| e["entity"] == "product" && e["item_id"] == product_id));
    assert!(entries.iter().any(|e| e["entity"] == "sample" && e["item_id"] == order_id));

    let response = get_auth(
        app,
        &format!("/api/v1/orders/{order_id}/history"),
        &cast.admin.token,
    )
    .await;
    let history = body_json(response).await["data"].clone();
    let routes = history
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["entity_type"] == "product" && e["action_type"] != "product_create")
        .count();
    assert_eq!(routes, 7);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_version_is_conflict(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let uri = format!("/api/v1/products/{product_id}/transition");

    let response = transition(&app, &uri, &cast.admin.token, "route", Some("client"), 1).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Same version again: someone already moved it.
    let response = transition(&app, &uri, &cast.client.token, "approve", None, 1).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_only_holder_may_act(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let uri = format!("/api/v1/products/{product_id}/transition");

    let response = transition(&app, &uri, &cast.client.token, "approve", None, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = transition(&app, &uri, &cast.admin.token, "teleport", None, 1).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_routing_notifies_new_holder(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let mut version = 1;

    step(&app, product_id, &cast.admin.token, "route", Some("manufacturer"), &mut version).await;

    let response = get_auth(app.clone(), "/api/v1/notifications/unread-count", &cast.maker.token).await;
    assert_eq!(body_json(response).await["data"]["count"], 1);

    let response = get_auth(app.clone(), "/api/v1/notifications", &cast.maker.token).await;
    let notifications = body_json(response).await["data"].clone();
    assert_eq!(notifications[0]["kind"], "product_routed");
    assert_eq!(notifications[0]["product_id"], product_id);

    // The actor is never notified of their own action.
    let response = get_auth(app, "/api/v1/notifications/unread-count", &cast.admin.token).await;
    assert_eq!(body_json(response).await["data"]["count"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sample_flow_locks_fee(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (order_id, _) = seed_order_with_product(&app, &cast).await;
    let uri = format!("/api/v1/orders/{order_id}/sample/transition");

    let view = body_json(
        get_auth(app.clone(), &format!("/api/v1/orders/{order_id}/sample/routing"), &cast.admin.token).await,
    )
    .await["data"]
        .clone();
    assert_eq!(view["entity"], "sample");
    assert_eq!(view["status"], "requested");
    let mut version = view["version"].as_i64().unwrap();

    for (token, action, destination) in [
        (&cast.admin.token, "route", Some("manufacturer")),
        (&cast.maker.token, "start_production", None),
        (&cast.maker.token, "ship", None),
        (&cast.admin.token, "route", Some("client")),
        (&cast.client.token, "approve", None),
    ] {
        let response = transition(&app, &uri, token, action, destination, version).await;
        assert_eq!(response.status(), StatusCode::OK, "sample {action} should succeed");
        let data = body_json(response).await["data"].clone();
        assert!(data.get("product").is_none());
        version = data["order"]["version"].as_i64().unwrap();
    }

    let order = body_json(
        get_auth(app.clone(), &format!("/api/v1/orders/{order_id}"), &cast.admin.token).await,
    )
    .await["data"]
        .clone();
    assert_eq!(order["sample_status"], "approved");
    assert_eq!(order["sample_locked"], true);

    let response = put_json_auth(
        app,
        &format!("/api/v1/orders/{order_id}/sample"),
        json!({ "sample_fee_cents": 9999 }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manufacturer_is_kept_while_in_production(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (order_id, product_id) = seed_order_with_product(&app, &cast).await;
    let mut version = 1;

    step(&app, product_id, &cast.admin.token, "route", Some("client"), &mut version).await;
    step(&app, product_id, &cast.client.token, "approve", None, &mut version).await;
    step(&app, product_id, &cast.admin.token, "approve", None, &mut version).await;
    step(&app, product_id, &cast.admin.token, "route", Some("manufacturer"), &mut version).await;
    step(&app, product_id, &cast.maker.token, "start_production", None, &mut version).await;

    let manufacturer_uri = format!("/api/v1/orders/{order_id}/manufacturer");
    let response = put_json_auth(
        app.clone(),
        &manufacturer_uri,
        json!({ "manufacturer_id": null }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");

    // The manufacturer still owns the run and can ship it.
    let data = step(&app, product_id, &cast.maker.token, "ship", None, &mut version).await;
    assert_eq!(data["product"]["product_status"], "shipped");

    let response = put_json_auth(
        app.clone(),
        &manufacturer_uri,
        json!({ "manufacturer_id": null }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["manufacturer_id"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sample_with_manufacturer_cannot_be_dropped(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (order_id, _) = seed_order_with_product(&app, &cast).await;

    let view = body_json(
        get_auth(app.clone(), &format!("/api/v1/orders/{order_id}/sample/routing"), &cast.admin.token).await,
    )
    .await["data"]
        .clone();
    let response = transition(
        &app,
        &format!("/api/v1/orders/{order_id}/sample/transition"),
        &cast.admin.token,
        "route",
        Some("manufacturer"),
        view["version"].as_i64().unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/orders/{order_id}/sample"),
        json!({ "sample_required": false }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/orders/{order_id}/manufacturer"),
        json!({ "manufacturer_id": null }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let order = body_json(
        get_auth(app, &format!("/api/v1/orders/{order_id}"), &cast.admin.token).await,
    )
    .await["data"]
        .clone();
    assert_eq!(order["sample_required"], true);
    assert_eq!(order["sample_routed_to"], "manufacturer");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approved_product_items_are_frozen(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let items_uri = format!("/api/v1/products/{product_id}/items");

    let response = post_json_auth(
        app.clone(),
        &items_uri,
        json!({ "variant": "Black / M", "quantity": 24 }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let item_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let mut version = 1;
    step(&app, product_id, &cast.admin.token, "route", Some("client"), &mut version).await;
    step(&app, product_id, &cast.client.token, "approve", None, &mut version).await;
    let data = step(&app, product_id, &cast.admin.token, "approve", None, &mut version).await;
    assert_eq!(data["product"]["is_locked"], true);

    let response = post_json_auth(
        app.clone(),
        &items_uri,
        json!({ "variant": "White / L", "quantity": 6 }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let item_uri = format!("/api/v1/items/{item_id}");
    let response = put_json_auth(app.clone(), &item_uri, json!({ "quantity": 48 }), &cast.admin.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = delete_auth(app.clone(), &item_uri, &cast.admin.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let items = body_json(get_auth(app, &items_uri, &cast.client.token).await).await["data"].clone();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["quantity"], 24);
}
