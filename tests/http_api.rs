//! End-to-end tests of the REST surface over the in-memory backends.

#![allow(clippy::panic, clippy::indexing_slicing)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use logistics_gateway::api::{self, actor::ACTOR_HEADER};
use logistics_gateway::app_state::AppState;
use logistics_gateway::domain::{GpsPolicy, ShipmentId, UserId};

fn app() -> Router {
    api::build_router().with_state(AppState::in_memory(GpsPolicy::default()))
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("readable body");
    };
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn request(method: &str, uri: &str, actor: Option<UserId>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor.to_string());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let Ok(request) = builder.body(body) else {
        panic!("valid request");
    };
    request
}

async fn create_shipment(app: &Router, actor: UserId, consignment: &str) -> String {
    let (status, body) = call(
        app,
        request(
            "POST",
            "/api/v1/shipments",
            Some(actor),
            Some(json!({
                "consignment_number": consignment,
                "source": "Mumbai Hub",
                "destination": "Pune Depot",
                "expected_delivery_date": "2026-06-01",
                "weight_kg": 120.5
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["current_status"], "created");
    let Some(id) = body["id"].as_str() else {
        panic!("shipment id in {body}");
    };
    id.to_string()
}

async fn advance(app: &Router, actor: UserId, id: &str, to: &str) -> (StatusCode, Value) {
    call(
        app,
        request(
            "POST",
            &format!("/api/v1/shipments/{id}/status"),
            Some(actor),
            Some(json!({ "status": to, "location": "Lonavala" })),
        ),
    )
    .await
}

async fn advance_to_delivered(app: &Router, actor: UserId, id: &str) {
    for to in ["packed", "dispatched", "in_transit", "out_for_delivery", "delivered"] {
        let (status, body) = advance(app, actor, id, to).await;
        assert_eq!(status, StatusCode::OK, "advancing to {to}: {body}");
        assert_eq!(body["current_status"], to);
    }
}

#[tokio::test]
async fn health_is_served_at_the_root() {
    let (status, body) = call(&app(), request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn full_lifecycle_with_proof_of_delivery() {
    let app = app();
    let actor = UserId::new();
    let id = create_shipment(&app, actor, "CN-1001").await;

    advance_to_delivered(&app, actor, &id).await;

    let (status, body) = call(
        &app,
        request(
            "POST",
            &format!("/api/v1/shipments/{id}/checkpoints"),
            Some(actor),
            Some(json!({
                "location": "Receiver gate",
                "latitude": 18.5204,
                "longitude": 73.8567,
                "accuracy_m": 12.0
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["gps"]["risk"], "low");

    let Ok(upload) = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/shipments/{id}/pod?file_name=receipt.jpg"))
        .header(ACTOR_HEADER, actor.to_string())
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(vec![0xFF_u8, 0xD8, 0xFF, 0xE0]))
    else {
        panic!("valid request");
    };
    let (status, pod) = call(&app, upload).await;
    assert_eq!(status, StatusCode::CREATED, "{pod}");
    assert_eq!(pod["content_type"], "jpeg");
    let object_path = pod["object_path"].clone();
    assert!(object_path.is_string());

    let (status, closed) = call(
        &app,
        request(
            "POST",
            &format!("/api/v1/shipments/{id}/close"),
            Some(actor),
            Some(json!({
                "delivered_to": "R. Kulkarni",
                "notes": "left with security",
                "object_path": object_path
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{closed}");
    assert_eq!(closed["current_status"], "closed");
    assert_eq!(closed["proof_of_delivery"]["delivered_to"], "R. Kulkarni");
    assert_eq!(closed["proof_of_delivery"]["object_path"], object_path);
    assert!(closed["closed_at"].is_string());

    let (status, log) = call(
        &app,
        request("GET", &format!("/api/v1/shipments/{id}/status-updates"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log.as_array().map(Vec::len), Some(6));

    let (status, timeline) = call(
        &app,
        request("GET", &format!("/api/v1/shipments/{id}/timeline"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{timeline}");
    assert_eq!(timeline["summary"]["total"], 7);
    assert_eq!(timeline["summary"]["status_count"], 6);
    assert_eq!(timeline["summary"]["checkpoint_count"], 1);
    assert_eq!(timeline["summary"]["current_status"], "closed");
    assert_eq!(timeline["entries"][0]["kind"], "status");
    assert_eq!(timeline["entries"][0]["status"], "closed");

    let (status, body) = advance(&app, actor, &id, "delivered").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2002);
}

#[tokio::test]
async fn skipping_a_status_is_rejected() {
    let app = app();
    let actor = UserId::new();
    let id = create_shipment(&app, actor, "CN-2001").await;

    let (status, body) = advance(&app, actor, &id, "dispatched").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2002);
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(message.contains("created"), "{message}");
    assert!(message.contains("dispatched"), "{message}");

    let (_, shipment) = call(&app, request("GET", &format!("/api/v1/shipments/{id}"), None, None)).await;
    assert_eq!(shipment["current_status"], "created");
}

#[tokio::test]
async fn close_checks_status_before_payload() {
    let app = app();
    let actor = UserId::new();
    let id = create_shipment(&app, actor, "CN-3001").await;
    let close_uri = format!("/api/v1/shipments/{id}/close");

    let (status, body) = call(&app, request("POST", &close_uri, Some(actor), Some(json!({})))).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    advance_to_delivered(&app, actor, &id).await;

    let (status, body) = call(
        &app,
        request("POST", &close_uri, Some(actor), Some(json!({ "delivered_to": "  " }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);

    let (status, body) = advance(&app, actor, &id, "closed").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn writes_require_an_actor() {
    let (status, body) = call(
        &app(),
        request(
            "POST",
            "/api/v1/shipments",
            None,
            Some(json!({ "consignment_number": "CN-9", "source": "A", "destination": "B" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 1005);
}

#[tokio::test]
async fn unknown_shipment_is_not_found() {
    let app = app();
    let missing = ShipmentId::new();
    for uri in [
        format!("/api/v1/shipments/{missing}"),
        format!("/api/v1/shipments/{missing}/timeline"),
        format!("/api/v1/shipments/{missing}/checkpoints"),
    ] {
        let (status, body) = call(&app, request("GET", &uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"]["code"], 2001);
    }
}

#[tokio::test]
async fn consignment_numbers_are_unique() {
    let app = app();
    let actor = UserId::new();
    create_shipment(&app, actor, "CN-4001").await;
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/v1/shipments",
            Some(actor),
            Some(json!({ "consignment_number": "CN-4001", "source": "A", "destination": "B" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2005);
}

#[tokio::test]
async fn queries_find_shipments() {
    let app = app();
    let actor = UserId::new();
    let first = create_shipment(&app, actor, "CN-5001").await;
    create_shipment(&app, actor, "CN-5002").await;
    let (status, _) = advance(&app, actor, &first, "packed").await;
    assert_eq!(status, StatusCode::OK);

    let (_, packed) = call(&app, request("GET", "/api/v1/shipments?status=packed", None, None)).await;
    assert_eq!(packed.as_array().map(Vec::len), Some(1));
    assert_eq!(packed[0]["id"], first.as_str());

    let (_, active) = call(&app, request("GET", "/api/v1/shipments/active", None, None)).await;
    assert_eq!(active.as_array().map(Vec::len), Some(2));

    let (_, found) = call(&app, request("GET", "/api/v1/shipments/search?q=cn-500", None, None)).await;
    assert_eq!(found.as_array().map(Vec::len), Some(2));

    let (status, body) = call(&app, request("GET", "/api/v1/shipments/search?q=", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
}

#[tokio::test]
async fn proof_of_delivery_admission() {
    let app = app();
    let actor = UserId::new();
    let id = create_shipment(&app, actor, "CN-6001").await;
    let uri = format!("/api/v1/shipments/{id}/pod?file_name=pod.bin");

    let Ok(gif) = Request::builder()
        .method("POST")
        .uri(&uri)
        .header(ACTOR_HEADER, actor.to_string())
        .header(header::CONTENT_TYPE, "image/gif")
        .body(Body::from(b"GIF89a".to_vec()))
    else {
        panic!("valid request");
    };
    let (status, body) = call(&app, gif).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], 1002);

    let Ok(huge) = Request::builder()
        .method("POST")
        .uri(&uri)
        .header(ACTOR_HEADER, actor.to_string())
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(vec![0_u8; 10 * 1024 * 1024 + 1]))
    else {
        panic!("valid request");
    };
    let (status, body) = call(&app, huge).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], 1003);
}

#[tokio::test]
async fn attendance_day() {
    let app = app();
    let user = UserId::new();
    let fix = json!({
        "date": "2026-05-04",
        "latitude": 12.9716,
        "longitude": 77.5946,
        "accuracy_m": 20.0,
        "location": "Whitefield depot"
    });

    let (status, record) = call(
        &app,
        request("POST", "/api/v1/attendance/check-in", Some(user), Some(fix.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{record}");
    assert!(record["check_out"].is_null());

    let (status, body) = call(
        &app,
        request("POST", "/api/v1/attendance/check-in", Some(user), Some(fix.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2003);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let mut check_out = fix.clone();
    check_out["deliveries_completed"] = json!(9);
    check_out["task_count"] = json!(3);
    let (status, record) = call(
        &app,
        request("POST", "/api/v1/attendance/check-out", Some(user), Some(check_out.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{record}");
    assert!(record["check_out"].is_object());
    assert_eq!(record["work"]["deliveries_completed"], 9);

    let (status, body) = call(
        &app,
        request("POST", "/api/v1/attendance/check-out", Some(user), Some(check_out)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2004);

    let (_, records) = call(
        &app,
        request("GET", "/api/v1/attendance?date=2026-05-04", Some(user), None),
    )
    .await;
    assert_eq!(records.as_array().map(Vec::len), Some(1));

    let (status, metrics) = call(
        &app,
        request("GET", "/api/v1/attendance/metrics?date=2026-05-04", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{metrics}");
    assert_eq!(metrics["total_present"], 1);
    assert_eq!(metrics["checked_out"], 1);
    assert_eq!(metrics["total_deliveries"], 9);
}

#[tokio::test]
async fn check_in_without_fix_is_rejected() {
    let (status, body) = call(
        &app(),
        request(
            "POST",
            "/api/v1/attendance/check-in",
            Some(UserId::new()),
            Some(json!({ "location": "depot" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
}

async fn upload_pod(app: &Router, actor: UserId, id: &str) -> Value {
    let Ok(upload) = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/shipments/{id}/pod?file_name=pod.png"))
        .header(ACTOR_HEADER, actor.to_string())
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(b"\x89PNG".to_vec()))
    else {
        panic!("valid request");
    };
    let (status, pod) = call(app, upload).await;
    assert_eq!(status, StatusCode::CREATED, "{pod}");
    pod["object_path"].clone()
}

#[tokio::test]
async fn close_only_accepts_paths_uploaded_for_the_shipment() {
    let app = app();
    let actor = UserId::new();
    let id = create_shipment(&app, actor, "CN-8001").await;
    let other = create_shipment(&app, actor, "CN-8002").await;
    advance_to_delivered(&app, actor, &id).await;
    let foreign_path = upload_pod(&app, actor, &other).await;

    for object_path in [json!("/objects/never/uploaded.jpg"), foreign_path] {
        let (status, body) = call(
            &app,
            request(
                "POST",
                &format!("/api/v1/shipments/{id}/close"),
                Some(actor),
                Some(json!({ "delivered_to": "Jane Doe", "object_path": object_path })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{object_path}: {body}");
        assert_eq!(body["error"]["code"], 1001);
    }

    let (_, shipment) = call(
        &app,
        request("GET", &format!("/api/v1/shipments/{id}"), None, None),
    )
    .await;
    assert_eq!(shipment["current_status"], "delivered");
    assert!(shipment["proof_of_delivery"].is_null());

    let own_path = upload_pod(&app, actor, &id).await;
    let (status, closed) = call(
        &app,
        request(
            "POST",
            &format!("/api/v1/shipments/{id}/close"),
            Some(actor),
            Some(json!({ "delivered_to": "Jane Doe", "object_path": own_path })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{closed}");
    assert_eq!(closed["proof_of_delivery"]["object_path"], own_path);
}

#[tokio::test]
async fn update_edits_details_but_never_status() {
    let app = app();
    let actor = UserId::new();
    let id = create_shipment(&app, actor, "CN-9001").await;
    let uri = format!("/api/v1/shipments/{id}");

    let (status, body) = call(
        &app,
        request(
            "PUT",
            &uri,
            Some(actor),
            Some(json!({
                "destination": "Nashik Depot",
                "expected_delivery_date": "2026-06-05",
                "notes": "gate 3",
                "current_status": "closed"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["destination"], "Nashik Depot");
    assert_eq!(body["notes"], "gate 3");
    assert_eq!(body["current_status"], "created");
    assert!(body["proof_of_delivery"].is_null());
    let due = body["expected_delivery_date"].as_str().unwrap_or_default();
    assert!(due.starts_with("2026-06-05T23:59:59"), "{due}");

    let (status, body) = call(
        &app,
        request(
            "PUT",
            &uri,
            Some(actor),
            Some(json!({ "dispatch_date": "2026-06-10" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"]["code"], 1001);

    let (status, body) = call(
        &app,
        request(
            "PUT",
            &uri,
            Some(actor),
            Some(json!({
                "client_id": UserId::new().to_string(),
                "vendor_id": UserId::new().to_string()
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = call(
        &app,
        request("PUT", &uri, None, Some(json!({ "notes": "no actor" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        request(
            "PUT",
            &format!("/api/v1/shipments/{}", ShipmentId::new()),
            Some(actor),
            Some(json!({ "notes": "nobody home" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 2001);

    let (_, log) = call(
        &app,
        request("GET", &format!("/api/v1/shipments/{id}/status-updates"), None, None),
    )
    .await;
    assert_eq!(log.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn dashboard_counts_shipments_by_status() {
    let app = app();
    let actor = UserId::new();
    let first = create_shipment(&app, actor, "CN-9101").await;
    let _ = create_shipment(&app, actor, "CN-9102").await;
    let (status, _) = advance(&app, actor, &first, "packed").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        request("GET", "/api/v1/shipments/dashboard", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total"], 2);
    assert_eq!(body["active"], 2);
    let Some(by_status) = body["by_status"].as_array() else {
        panic!("by_status in {body}");
    };
    assert_eq!(by_status.len(), 7);
    assert_eq!(by_status[0]["status"], "created");
    assert_eq!(by_status[0]["count"], 1);
    assert_eq!(by_status[1]["status"], "packed");
    assert_eq!(by_status[1]["count"], 1);
}
