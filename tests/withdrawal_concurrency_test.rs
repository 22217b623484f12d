mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{read_json, TestApp};
use serde_json::json;
use tower::ServiceExt;

/// With N-1 units available and N concurrent single-unit withdrawals, exactly
/// one request must fail with insufficient stock and the rest must land. The
/// harness pins the pool to one connection so transactions serialize and the
/// outcome is deterministic.
#[tokio::test]
async fn concurrent_withdrawals_never_overdraw() {
    const ATTEMPTS: usize = 8;
    const AVAILABLE: usize = ATTEMPTS - 1;

    let app = TestApp::new().await;

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/items",
            Some(json!({"name": "Highlighter", "quantity": AVAILABLE})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    let item_id = body["data"]["item"]["id"].as_str().unwrap().to_string();

    let mut tasks = Vec::with_capacity(ATTEMPTS);
    for _ in 0..ATTEMPTS {
        let router = app.router();
        let token = app.user_token().to_string();
        let item_id = item_id.clone();
        tasks.push(tokio::spawn(async move {
            let payload = json!({"item_id": item_id, "quantity": 1});
            let request = Request::builder()
                .method(Method::POST)
                .uri("/api/v1/withdrawals")
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::CREATED => successes += 1,
            StatusCode::UNPROCESSABLE_ENTITY => insufficient += 1,
            other => panic!("unexpected status: {}", other),
        }
    }

    assert_eq!(successes, AVAILABLE);
    assert_eq!(insufficient, 1);

    // Every success is on the ledger and the item is exactly empty.
    let response = app
        .request_as_admin(Method::GET, "/api/v1/reports/stock", None)
        .await;
    let body = read_json(response).await;
    let item = &body["data"]["items"][0];
    assert_eq!(item["available_quantity"], 0);
    assert_eq!(item["taken_quantity"], AVAILABLE);
    assert_eq!(
        item["withdrawals"].as_array().unwrap().len(),
        AVAILABLE
    );
}

/// Interleaved restocks and withdrawals keep the arithmetic consistent: the
/// reported total always equals available plus the withdrawal sum.
#[tokio::test]
async fn restocks_and_withdrawals_reconcile() {
    let app = TestApp::new().await;

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/items",
            Some(json!({"name": "Envelope", "quantity": 20})),
        )
        .await;
    let body = read_json(response).await;
    let item_id = body["data"]["item"]["id"].as_str().unwrap().to_string();

    for quantity in [3, 7, 2] {
        let response = app
            .request_as_user(
                Method::POST,
                "/api/v1/withdrawals",
                Some(json!({"item_id": item_id, "quantity": quantity})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Restock through the merge path.
    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/items",
            Some(json!({"name": "Envelope", "quantity": 5})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_as_admin(Method::GET, "/api/v1/reports/stock", None)
        .await;
    let body = read_json(response).await;
    let item = &body["data"]["items"][0];

    // 20 - 12 withdrawn + 5 restocked = 13 available; total = 13 + 12.
    assert_eq!(item["available_quantity"], 13);
    assert_eq!(item["taken_quantity"], 12);
    assert_eq!(item["total_quantity"], 25);

    // Breakdown preserves insertion order.
    let quantities: Vec<i64> = item["withdrawals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, vec![3, 7, 2]);
}
