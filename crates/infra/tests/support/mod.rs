//! Shared fixtures for infra integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use erpsync_domain::ErpConfig;
use erpsync_infra::database::DbManager;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Temporary database with the schema applied and config rows seeded.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    pub temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = open(&temp_dir);
        Self { manager, temp_dir }
    }

    /// A second manager over the same file, as after a process restart.
    pub fn reopen(&self) -> Arc<DbManager> {
        open(&self.temp_dir)
    }

    pub fn execute_batch(&self, sql: &str) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute_batch(sql).expect("SQL batch should succeed");
    }
}

fn open(dir: &TempDir) -> Arc<DbManager> {
    let manager =
        DbManager::new(dir.path().join("mirror.db"), 4).expect("db manager should be created");
    manager.run_migrations().expect("migrations should apply");
    manager.seed_sync_configs(Utc::now()).expect("config rows should seed");
    Arc::new(manager)
}

pub fn erp_config(server: &MockServer) -> ErpConfig {
    ErpConfig {
        base_url: server.uri(),
        username: "sync-user".into(),
        password: "sync-pass".into(),
        timeout_seconds: 5,
        max_attempts: 1,
    }
}

/// Login endpoint answering with `token`, valid for an hour.
pub async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/Auth/Login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
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
                "cantidadUMB": 5.0 * n as f64,
                "uoMCode": "UN",
                "uoMEntry": 1
            })
        })
        .collect();

    json!({
        "numeroDespacho": numero,
        "tipoDespacho": tipo,
        "numeroBusqueda": numero + 900_000,
        "fechaCreacion": "2024-06-01T08:00:00",
        "codigoCliente": "C-042",
        "nombreCliente": "Distribuidora Norte",
        "lines": lines
    })
}

pub fn item(code: &str) -> Value {
    json!({
        "codigoProducto": code,
        "descripcionProducto": format!("Producto {code}"),
        "codigoFamilia": 2,
        "nombreFamilia": "Bebidas",
        "codigoUMB": "UN"
    })
}
