//! Console routes end to end: router, services, SQLite and a mock ERP.

mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::TestApp;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn lists_seeded_configs_in_entity_order() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/sync-config/").await;

    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> =
        body.as_array().unwrap().iter().map(|c| c["entity_type"].as_str().unwrap()).collect();
    assert_eq!(types, ["ITEMS", "DISPATCHES", "GOODS_RECEIPTS", "PROCUREMENT_ORDERS"]);
    assert_eq!(body[1]["sync_interval_minutes"], 60);
    assert_eq!(body[1]["api_endpoint"], "/Transaction/Orders");
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_update_changes_only_named_fields() {
    let app = TestApp::new().await;

    let (status, body) =
        app.put("/sync-config/dispatches", json!({ "sync_interval_minutes": 15 })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_type"], "DISPATCHES");
    assert_eq!(body["sync_interval_minutes"], 15);
    assert_eq!(body["batch_size"], 100);
    assert_eq!(body["sync_enabled"], true);

    let (_, stored) = app.get("/sync-config/DISPATCHES").await;
    assert_eq!(stored["sync_interval_minutes"], 15);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_tunables_are_rejected_before_storage() {
    let app = TestApp::new().await;

    let (status, body) = app.put("/sync-config/ITEMS", json!({ "sync_interval_minutes": 0 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "CONFIG_ERROR");

    let (status, _) = app.put("/sync-config/ITEMS", json!({ "batch_size": -5 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, stored) = app.get("/sync-config/ITEMS").await;
    assert_eq!(stored["sync_interval_minutes"], 60);
    assert_eq!(stored["batch_size"], 100);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_entity_type_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/sync-config/INVOICES").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _) = app.post("/sync/INVOICES", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_sync_inserts_then_reports_no_phantom_update() {
    let app = TestApp::new().await;
    Mock::given(method("GET"))
        .and(path("/Transaction/Orders/201/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(support::dispatch(201, 12345, 3)))
        .mount(&app.erp)
        .await;

    let request = json!({ "tipoDespacho": 201, "docNum": 12345 });
    let (status, first) = app.post("/sync/single-dispatch", request.clone()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    let data = &first["data"];
    assert_eq!(data["action"], "INSERTED");
    assert_eq!(data["numeroDespacho"], 12345);
    assert_eq!(data["nombreCliente"], "Comercial Sur");
    assert_eq!(data["stats"]["inserted"], 1);
    assert_eq!(data["stats"]["lines_inserted"], 3);
    assert_eq!(data["stats"]["lines_updated"], 0);
    assert_eq!(data["stats"]["lines_skipped"], 0);
    assert!(data["processing_time"].as_f64().unwrap() >= 0.0);

    let (status, second) = app.post("/sync/single-dispatch", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["action"], "SKIPPED");
    assert_eq!(second["data"]["stats"]["lines_skipped"], 3);
    assert_eq!(second["data"]["stats"]["updated"], 0);

    let (status, presence) = app.get("/dispatch/201/12345").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(presence, json!({ "exists": true, "lines_count": 3 }));
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_sync_of_missing_document_fails_with_envelope() {
    let app = TestApp::new().await;
    Mock::given(method("GET"))
        .and(path("/Transaction/Orders/202/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.erp)
        .await;

    let (status, body) =
        app.post("/sync/single-dispatch", json!({ "dispatch_type": 202, "doc_num": 404 })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Dispatch 202/404 was not found in the ERP");
    assert!(body.get("data").is_none());

    let (_, presence) = app.get("/dispatch/202/404").await;
    assert_eq!(presence, json!({ "exists": false, "lines_count": 0 }));
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_sync_surfaces_transport_failure_without_retry() {
    let app = TestApp::new().await;
    Mock::given(method("GET"))
        .and(path("/Transaction/Orders/203/1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&app.erp)
        .await;

    let (status, body) =
        app.post("/sync/single-dispatch", json!({ "tipoDespacho": 203, "docNum": 1 })).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_sync_with_unparseable_body_still_answers_with_envelope() {
    let app = TestApp::new().await;

    let (status, body) =
        app.post("/sync/single-dispatch", json!({ "dispatch_type": "abc", "doc_num": 1 })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Invalid request"));
    assert!(body.get("data").is_none());

    let (status, body) = app.post("/sync/single-dispatch", json!({ "doc_num": 1 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn triggered_sync_runs_and_reschedules_the_entity() {
    let app = TestApp::new().await;
    Mock::given(method("GET"))
        .and(path("/Transaction/Orders"))
        .and(query_param("skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            support::dispatch(201, 1, 1),
            support::dispatch(201, 2, 2),
        ])))
        .mount(&app.erp)
        .await;

    let (status, run) = app.post("/sync/DISPATCHES", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["entity_type"], "DISPATCHES");
    assert_eq!(run["status"], "COMPLETED");
    assert_eq!(run["headers"]["inserted"], 2);
    assert_eq!(run["lines"]["inserted"], 3);

    let (_, config) = app.get("/sync-config/DISPATCHES").await;
    assert!(config["last_sync_at"].is_string());
    assert!(config["next_sync_at"].is_string());

    let (_, status_body) = app.get("/sync/status").await;
    assert_eq!(status_body["scheduler_running"], false);
    assert_eq!(status_body["in_flight"], json!([]));
    let dispatches = status_body["entities"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["entity_type"] == "DISPATCHES")
        .unwrap();
    assert_eq!(dispatches["last_run"]["headers"]["inserted"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_type_catalogue_and_health() {
    let app = TestApp::new().await;

    let (status, types) = app.get("/sync/dispatch-types").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(types.as_array().unwrap().len(), 4);
    assert_eq!(types[0], json!({ "code": 201, "name": "Normal" }));

    let (status, health) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["database"], "ok");
}
