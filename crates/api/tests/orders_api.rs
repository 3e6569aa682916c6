//! HTTP-level tests for orders, products, items, accessories and the
//! role-projected pricing they expose.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, delete_auth, get_auth, post_json_auth, put_json_auth, seed_cast,
    seed_order_with_product, seed_user,
};
use orderflow_core::roles::Role;
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Creation and RBAC
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_creates_draft_order(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/orders",
        json!({ "name": "Spring merch", "client_id": cast.client.id }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let order = body_json(response).await["data"].clone();
    assert_eq!(order["status"], "draft");
    assert_eq!(order["client_id"], cast.client.id);
    assert_eq!(order["is_client_request"], false);
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["sample_status"], "requested");
    assert_eq!(order["sample_routed_to"], "admin");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_order_requires_active_client(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/orders",
        json!({ "name": "No client" }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A manufacturer is not a client.
    let response = post_json_auth(
        app,
        "/api/v1/orders",
        json!({ "name": "Wrong role", "client_id": cast.maker.id }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// A client's order is a request: it belongs to them and every admin is told.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_client_request_notifies_admins(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/orders",
        json!({ "name": "Tote bags", "client_id": 999_999 }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_json(response).await["data"].clone();
    assert_eq!(order["client_id"], cast.client.id);
    assert_eq!(order["is_client_request"], true);

    let response = get_auth(app, "/api/v1/notifications", &cast.admin.token).await;
    let notifications = body_json(response).await["data"].clone();
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["kind"], "client_request");
    assert_eq!(notifications[0]["order_id"], order["id"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_client_cannot_pick_manufacturer(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/orders",
        json!({ "name": "Caps", "manufacturer_id": cast.maker.id }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manufacturer_cannot_create_orders(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/orders",
        json!({ "name": "Mugs", "client_id": cast.client.id }),
        &cast.maker.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Orders outside the caller's scope look like they do not exist.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_foreign_order_is_not_found(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let stranger = seed_user(&pool, "stranger", Role::Client).await;
    let other_maker = seed_user(&pool, "othermaker", Role::Manufacturer).await;
    let app = common::build_test_app(pool);
    let (order_id, product_id) = seed_order_with_product(&app, &cast).await;

    for token in [&stranger.token, &other_maker.token] {
        let response = get_auth(app.clone(), &format!("/api/v1/orders/{order_id}"), token).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            get_auth(app.clone(), &format!("/api/v1/products/{product_id}"), token).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = get_auth(app.clone(), "/api/v1/orders", &stranger.token).await;
    let page = body_json(response).await["data"].clone();
    assert_eq!(page["total"], 0);
    assert!(page["items"].as_array().unwrap().is_empty());

    let response = get_auth(app, "/api/v1/orders", &cast.maker.token).await;
    let page = body_json(response).await["data"].clone();
    assert_eq!(page["total"], 1);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_then_cancel(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (order_id, _) = seed_order_with_product(&app, &cast).await;

    let uri = format!("/api/v1/orders/{order_id}/submit");
    let response = post_json_auth(app.clone(), &uri, json!({}), &cast.admin.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "submitted");

    // Only drafts can be submitted.
    let response = post_json_auth(app.clone(), &uri, json!({}), &cast.admin.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/orders/{order_id}/cancel"),
        json!({}),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "cancelled");

    // Nothing inside a cancelled order can change.
    let response = post_json_auth(
        app,
        &format!("/api/v1/orders/{order_id}/products"),
        json!({ "name": "Too late" }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_history_lists_audit_entries(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (order_id, _) = seed_order_with_product(&app, &cast).await;

    let response = get_auth(
        app.clone(),
        &format!("/api/v1/orders/{order_id}/history"),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let entries = body_json(response).await["data"].clone();
    let actions: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action_type"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["order_create", "product_create"]);

    let response = get_auth(
        app,
        &format!("/api/v1/orders/{order_id}/history"),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Products and pricing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pricing_is_projected_per_role(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/products/{product_id}/pricing"),
        json!({
            "manufacturer_unit_cost_cents": 500,
            "client_unit_price_cents": 900,
        }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let admin_view = body_json(response).await["data"].clone();
    assert_eq!(admin_view["manufacturer_unit_cost_cents"], 500);
    assert_eq!(admin_view["client_unit_price_cents"], 900);

    let uri = format!("/api/v1/products/{product_id}");
    let maker_view = body_json(get_auth(app.clone(), &uri, &cast.maker.token).await).await;
    assert_eq!(maker_view["data"]["manufacturer_unit_cost_cents"], 500);
    assert!(maker_view["data"].get("client_unit_price_cents").is_none());

    let client_view = body_json(get_auth(app, &uri, &cast.client.token).await).await;
    assert_eq!(client_view["data"]["client_unit_price_cents"], 900);
    assert!(client_view["data"].get("manufacturer_unit_cost_cents").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pricing_permissions(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let uri = format!("/api/v1/products/{product_id}/pricing");

    // The manufacturer does not hold the product yet.
    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({ "manufacturer_unit_cost_cents": 450 }),
        &cast.maker.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({ "client_unit_price_cents": 1 }),
        &cast.maker.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({ "client_unit_price_cents": 1 }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({ "client_unit_price_cents": -5 }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(app, &uri, json!({}), &cast.admin.token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_markup_derives_client_price(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let uri = format!("/api/v1/products/{product_id}/pricing");

    // Nothing to mark up yet.
    let response = put_json_auth(app.clone(), &uri, json!({ "markup_bps": 2500 }), &cast.admin.token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({ "manufacturer_unit_cost_cents": 333, "markup_bps": 1500 }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["manufacturer_unit_cost_cents"], 333);
    assert_eq!(data["client_unit_price_cents"], 383);

    // The stored cost is used when none is sent.
    let response = put_json_auth(app.clone(), &uri, json!({ "markup_bps": 2500 }), &cast.admin.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["client_unit_price_cents"], 416);

    let response = put_json_auth(
        app,
        &uri,
        json!({ "client_unit_price_cents": 900, "markup_bps": 2500 }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manufacturer_updates_only_fulfilment_fields(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let uri = format!("/api/v1/products/{product_id}");

    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({ "tracking_number": "1Z999", "production_eta": "2026-11-30" }),
        &cast.maker.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let product = body_json(response).await["data"].clone();
    assert_eq!(product["tracking_number"], "1Z999");
    assert_eq!(product["production_eta"], "2026-11-30");

    let response =
        put_json_auth(app, &uri, json!({ "name": "Renamed" }), &cast.maker.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Items, accessories and the summary
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_item_quantity_is_validated(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (_, product_id) = seed_order_with_product(&app, &cast).await;
    let uri = format!("/api/v1/products/{product_id}/items");

    let response = post_json_auth(
        app.clone(),
        &uri,
        json!({ "variant": "Blue", "quantity": 0 }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = post_json_auth(
        app.clone(),
        &uri,
        json!({ "variant": "Blue", "quantity": 25 }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let item_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/items/{item_id}"),
        json!({ "quantity": 30 }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["quantity"], 30);

    // Manufacturers see items but do not edit them.
    let response = delete_auth(app, &format!("/api/v1/items/{item_id}"), &cast.maker.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_summary_totals_per_role(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (order_id, product_id) = seed_order_with_product(&app, &cast).await;

    put_json_auth(
        app.clone(),
        &format!("/api/v1/products/{product_id}/pricing"),
        json!({
            "manufacturer_unit_cost_cents": 500,
            "client_unit_price_cents": 900,
            "manufacturer_shipping_cents": 1000,
            "client_shipping_cents": 1500,
        }),
        &cast.admin.token,
    )
    .await;
    post_json_auth(
        app.clone(),
        &format!("/api/v1/products/{product_id}/items"),
        json!({ "variant": "Navy", "quantity": 10 }),
        &cast.admin.token,
    )
    .await;
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/orders/{order_id}/accessories"),
        json!({
            "name": "Gift box",
            "quantity": 2,
            "unit_cost_cents": 100,
            "client_unit_price_cents": 250,
        }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/orders/{order_id}/sample"),
        json!({ "sample_fee_cents": 3000 }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/api/v1/orders/{order_id}/summary");

    let admin = body_json(get_auth(app.clone(), &uri, &cast.admin.token).await).await["data"].clone();
    assert_eq!(admin["product_count"], 1);
    assert_eq!(admin["total_quantity"], 10);
    // cost: 10 x 500 + 1000 shipping + 2 x 100 = 6200
    // price: 10 x 900 + 1500 shipping + 2 x 250 + 3000 sample = 14000
    assert_eq!(admin["totals"]["total_cost"], 6200);
    assert_eq!(admin["totals"]["total_price"], 14000);
    assert_eq!(admin["totals"]["margin"], 7800);

    let client = body_json(get_auth(app.clone(), &uri, &cast.client.token).await).await["data"].clone();
    assert_eq!(client["totals"]["total_price"], 14000);
    assert_eq!(client["totals"]["sample_fee"], 3000);
    assert!(client["totals"].get("total_cost").is_none());
    assert!(client["totals"].get("margin").is_none());

    let maker = body_json(get_auth(app, &uri, &cast.maker.token).await).await["data"].clone();
    assert_eq!(maker["totals"]["total_cost"], 6200);
    assert!(maker["totals"].get("total_price").is_none());
    assert!(maker["totals"].get("sample_fee").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_accessories_are_admin_managed(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let app = common::build_test_app(pool);
    let (order_id, _) = seed_order_with_product(&app, &cast).await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/orders/{order_id}/accessories"),
        json!({ "name": "Stickers", "quantity": 100 }),
        &cast.client.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
