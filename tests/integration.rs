use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use backoffice_core::api::rest::router;
use backoffice_core::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const OPERATOR: &str = "6d9f1c7e-8a2b-4f30-9c55-2f1e4b8a0d11";

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(1024, 60)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn op_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-operator-id", OPERATOR)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_driver(app: &axum::Router, name: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({ "name": name, "phone": "555-0100" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn create_order(app: &axum::Router, customer: &str, cents: u64) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "customer_name": customer,
                "items": [{
                    "product_id": Uuid::new_v4(),
                    "product_name": "Espresso beans",
                    "quantity": 1,
                    "unit_price_cents": cents
                }],
                "shift": "morning"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["drivers"], 0);
    assert_eq!(body["unread_notifications"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("notifications_unread"));
    assert!(body.contains("assignment_conflicts_total"));
}

#[tokio::test]
async fn create_order_returns_pending_with_snapshot_total() {
    let app = setup();
    let order = create_order(&app, "Ada Lovelace", 1250).await;

    assert_eq!(order["status"], "pending");
    assert_eq!(order["amount_cents"], 1250);
    assert!(order["driver_id"].is_null());
    assert!(order["cancellation_reason"].is_null());
    assert!(order["delivered_at"].is_null());
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
}

#[tokio::test]
async fn create_order_without_items_returns_400() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({ "customer_name": "Ada", "items": [], "shift": null }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_order_with_overflowing_total_returns_400() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "customer_name": "Ada",
                "items": [
                    {
                        "product_id": Uuid::new_v4(),
                        "product_name": "Bulk crate",
                        "quantity": 3,
                        "unit_price_cents": u64::MAX / 2
                    }
                ],
                "shift": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_order_publishes_new_order_notification() {
    let app = setup();
    create_order(&app, "Ada", 100).await;

    let res = app.oneshot(get_request("/notifications")).await.unwrap();
    let body = body_json(res).await;
    let unread = body["unread"].as_array().unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0]["kind"], "new_order");
    assert!(body["read"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/orders/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assign_requires_operator_header() {
    let app = setup();
    let order = create_order(&app, "Ada", 100).await;
    let driver_id = create_driver(&app, "Dan").await;

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{}/assign", order["id"].as_str().unwrap()),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_delivery_flow() {
    let app = setup();
    let order = create_order(&app, "Ada", 2999).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let driver_id = create_driver(&app, "Dan").await;

    let res = app
        .clone()
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let in_transit = body_json(res).await;
    assert_eq!(in_transit["status"], "in_transit");
    assert_eq!(in_transit["driver_id"], driver_id.as_str());

    let res = app
        .clone()
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/transition"),
            json!({ "target": "delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let delivered = body_json(res).await;
    assert_eq!(delivered["status"], "delivered");
    assert!(!delivered["delivered_at"].is_null());

    // Delivered is terminal: no further transition succeeds, and the error
    // body surfaces the true current status.
    let res = app
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/transition"),
            json!({ "target": "canceled", "reason": "other" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["current_status"], "delivered");
}

#[tokio::test]
async fn second_assign_observes_conflict_with_winner_status() {
    let app = setup();
    let order = create_order(&app, "Ada", 100).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let dan = create_driver(&app, "Dan").await;
    let eve = create_driver(&app, "Eve").await;

    let res = app
        .clone()
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            json!({ "driver_id": dan }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            json!({ "driver_id": eve }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["current_status"], "in_transit");

    // The order kept exactly the winner's driver.
    let res = app
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let stored = body_json(res).await;
    assert_eq!(stored["driver_id"], dan.as_str());
}

#[tokio::test]
async fn concurrent_assigns_exactly_one_winner() {
    let app = setup();
    let order = create_order(&app, "Ada", 100).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let dan = create_driver(&app, "Dan").await;
    let eve = create_driver(&app, "Eve").await;

    let req_a = app.clone().oneshot(op_request(
        "POST",
        &format!("/orders/{order_id}/assign"),
        json!({ "driver_id": dan }),
    ));
    let req_b = app.clone().oneshot(op_request(
        "POST",
        &format!("/orders/{order_id}/assign"),
        json!({ "driver_id": eve }),
    ));

    let (res_a, res_b) = tokio::join!(req_a, req_b);
    let statuses = [res_a.unwrap().status(), res_b.unwrap().status()];

    let winners = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let losers = statuses
        .iter()
        .filter(|s| **s == StatusCode::CONFLICT)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 1);

    let res = app
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let stored = body_json(res).await;
    assert_eq!(stored["status"], "in_transit");
    assert!(!stored["driver_id"].is_null());
}

#[tokio::test]
async fn reassign_swaps_driver_on_in_transit_order() {
    let app = setup();
    let order = create_order(&app, "Ada", 100).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let dan = create_driver(&app, "Dan").await;
    let eve = create_driver(&app, "Eve").await;

    // Reassign is not reachable for a Pending order.
    let res = app
        .clone()
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/reassign"),
            json!({ "driver_id": dan }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    app.clone()
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            json!({ "driver_id": dan }),
        ))
        .await
        .unwrap();

    let res = app
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/reassign"),
            json!({ "driver_id": eve }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "in_transit");
    assert_eq!(body["driver_id"], eve.as_str());
}

#[tokio::test]
async fn cancel_with_unknown_reason_returns_400() {
    let app = setup();
    let order = create_order(&app, "Ada", 100).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            json!({ "reason": "changed_my_mind" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_restore_cancel_keeps_latest_reason() {
    let app = setup();
    let order = create_order(&app, "Ada", 100).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            json!({ "reason": "out_of_stock" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let canceled = body_json(res).await;
    assert_eq!(canceled["cancellation_reason"], "out_of_stock");

    let res = app
        .clone()
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/restore"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let restored = body_json(res).await;
    assert_eq!(restored["status"], "pending");
    assert!(restored["cancellation_reason"].is_null());
    assert!(restored["driver_id"].is_null());

    let res = app
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            json!({ "reason": "customer_request" }),
        ))
        .await
        .unwrap();
    let recanceled = body_json(res).await;
    assert_eq!(recanceled["cancellation_reason"], "customer_request");
}

#[tokio::test]
async fn restore_of_pending_order_returns_conflict() {
    let app = setup();
    let order = create_order(&app, "Ada", 100).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .oneshot(op_request(
            "POST",
            &format!("/orders/{order_id}/restore"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["current_status"], "pending");
}

#[tokio::test]
async fn canceled_bucket_filters_by_reason() {
    let app = setup();
    let a = create_order(&app, "Ada", 100).await;
    let b = create_order(&app, "Grace", 100).await;

    for (order, reason) in [(&a, "delivery_issue"), (&b, "out_of_stock")] {
        let res = app
            .clone()
            .oneshot(op_request(
                "POST",
                &format!("/orders/{}/cancel", order["id"].as_str().unwrap()),
                json!({ "reason": reason }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .clone()
        .oneshot(get_request("/orders?status=canceled&reason=delivery_issue"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["orders"][0]["id"], a["id"]);

    let res = app.oneshot(get_request("/orders/counts")).await.unwrap();
    let counts = body_json(res).await;
    assert_eq!(counts["canceled"], 2);
    assert_eq!(counts["pending"], 0);
}

#[tokio::test]
async fn list_orders_search_and_sort() {
    let app = setup();
    create_order(&app, "Ada Lovelace", 300).await;
    create_order(&app, "Grace Hopper", 100).await;
    create_order(&app, "Adam Smith", 200).await;

    let res = app
        .clone()
        .oneshot(get_request("/orders?status=pending&search=ada"))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["total"], 2);

    let res = app
        .oneshot(get_request(
            "/orders?status=pending&sort_by=amount&sort_order=asc",
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    let amounts: Vec<u64> = body["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["amount_cents"].as_u64().unwrap())
        .collect();
    assert_eq!(amounts, vec![100, 200, 300]);
}

#[tokio::test]
async fn list_orders_with_huge_page_number_returns_empty_page() {
    let app = setup();
    create_order(&app, "Ada", 100).await;

    let res = app
        .oneshot(get_request(&format!(
            "/orders?status=pending&page={}",
            usize::MAX
        )))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["total"], 1);
    assert!(body["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn mark_all_read_is_idempotent() {
    let app = setup();
    create_order(&app, "Ada", 100).await;
    create_order(&app, "Grace", 100).await;

    let res = app
        .clone()
        .oneshot(op_request("POST", "/notifications/read-all", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["marked"], 2);

    let res = app
        .clone()
        .oneshot(op_request("POST", "/notifications/read-all", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["marked"], 0);

    let res = app.oneshot(get_request("/notifications")).await.unwrap();
    let body = body_json(res).await;
    assert!(body["unread"].as_array().unwrap().is_empty());
    assert_eq!(body["read"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn mark_read_twice_is_a_no_op_success() {
    let app = setup();
    create_order(&app, "Ada", 100).await;

    let res = app.clone().oneshot(get_request("/notifications")).await.unwrap();
    let body = body_json(res).await;
    let id = body["unread"][0]["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let res = app
            .clone()
            .oneshot(op_request(
                "POST",
                &format!("/notifications/{id}/read"),
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "read");
    }
}

#[tokio::test]
async fn support_ping_is_rate_limited_per_operator() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(op_request("POST", "/support/ping", json!({ "message": "help" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(op_request("POST", "/support/ping", json!({ "message": "help!" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(res).await;
    assert!(body["retry_after_secs"].as_i64().unwrap() >= 1);

    // Another operator is on their own cooldown.
    let other = Uuid::new_v4();
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/support/ping")
                .header("content-type", "application/json")
                .header("x-operator-id", other.to_string())
                .body(Body::from(json!({ "message": "hi" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Exactly two pings made it into the ledger.
    let res = app.oneshot(get_request("/notifications")).await.unwrap();
    let body = body_json(res).await;
    let pings = body["unread"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == "support_ping")
        .count();
    assert_eq!(pings, 2);
}

#[tokio::test]
async fn lifecycle_events_reach_ws_subscribers() {
    let state = Arc::new(AppState::new(64, 60));
    let mut rx = state.fanout.subscribe();
    let app = router(state);

    create_order(&app, "Ada", 100).await;

    let event = rx.recv().await.unwrap();
    assert_eq!(
        serde_json::to_value(&event.kind).unwrap(),
        json!("new_order")
    );
    assert!(event.message.contains("Ada"));
}
