//! Shared fixtures for console route tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use erpsync_api::{router, AppContext};
use erpsync_domain::{Config, DatabaseConfig, ErpConfig, SchedulerSettings};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A console wired to a temporary database and a mock ERP.
pub struct TestApp {
    pub ctx: Arc<AppContext>,
    pub erp: MockServer,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let erp = MockServer::start().await;
        mount_login(&erp).await;

        let dir = TempDir::new().expect("temp dir should be created");
        let config = Config {
            database: DatabaseConfig {
                path: dir.path().join("console.db").to_string_lossy().into_owned(),
                pool_size: 4,
            },
            erp: ErpConfig {
                base_url: erp.uri(),
                username: "sync-user".into(),
                password: "sync-pass".into(),
                timeout_seconds: 5,
                max_attempts: 1,
            },
            scheduler: SchedulerSettings {
                enabled: false,
                backoff_base_ms: 1,
                backoff_max_ms: 1,
                ..SchedulerSettings::default()
            },
            ..Config::default()
        };

        let ctx = AppContext::new(config).await.expect("context should initialize");
        Self { ctx: Arc::new(ctx), erp, _dir: dir }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.ctx))
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("PUT", uri, body)).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/Auth/Login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "console-token",
            "expirationDate": (Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
        })))
        .mount(server)
        .await;
}

pub fn dispatch(tipo: i64, numero: i64, lines: usize) -> Value {
    let lines: Vec<Value> = (1..=lines as i64)
        .map(|n| {
            json!({
                "lineNum": n,
                "codigoProducto": format!("P-{n}"),
                "nombreProducto": format!("Producto {n}"),
                "almacen": "01",
                "cantidadUMB": 2.5 * n as f64,
                "uoMCode": "UN",
                "uoMEntry": 1
            })
        })
        .collect();

    json!({
        "numeroDespacho": numero,
        "tipoDespacho": tipo,
        "numeroBusqueda": numero + 500_000,
        "fechaCreacion": "2024-06-01T08:00:00",
        "codigoCliente": "C-007",
        "nombreCliente": "Comercial Sur",
        "lines": lines
    })
}
