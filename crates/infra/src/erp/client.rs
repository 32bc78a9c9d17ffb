//! HTTP implementation of the `ErpGateway` port
//!
//! Authenticates with `POST /Auth/Login`, caches the bearer token until its
//! expiration and refreshes it once when a call comes back 401.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use erpsync_common::time::{Clock, SystemClock};
use erpsync_core::{ErpGateway, ExternalRecord, Page, PageRequest};
use erpsync_domain::{EntityType, ErpConfig, NaturalKey, Result, SyncError};
use reqwest::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::errors::{ErpError, ErpErrorCategory};
use crate::http::HttpClient;

const LOGIN_PATH: &str = "/Auth/Login";
/// Refresh this long before the advertised expiration.
const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;
/// Lifetime assumed when the login response carries no usable expiration.
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Serialize)]
struct LoginRequest<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    expiration_date: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct ErpClient {
    base_url: Url,
    http: HttpClient,
    username: String,
    password: String,
    token: Mutex<Option<CachedToken>>,
    clock: Arc<dyn Clock>,
}

impl ErpClient {
    pub fn new(config: &ErpConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout())
            .max_attempts(config.max_attempts)
            .user_agent(concat!("erpsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_http(config, http, Arc::new(SystemClock))
    }

    pub fn with_http(config: &ErpConfig, http: HttpClient, clock: Arc<dyn Clock>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            SyncError::Config(format!("invalid ERP base URL '{}': {err}", config.base_url))
        })?;

        Ok(Self {
            base_url,
            http,
            username: config.username.clone(),
            password: config.password.clone(),
            token: Mutex::new(None),
            clock,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Current bearer token, logging in when absent or about to expire.
    async fn bearer(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        let now = self.clock.now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - ChronoDuration::seconds(TOKEN_EXPIRY_SKEW_SECS) > now {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.login().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn invalidate_token(&self) {
        self.token.lock().await.take();
    }

    #[instrument(skip(self))]
    async fn login(&self) -> Result<CachedToken> {
        let body = LoginRequest { name: &self.username, password: &self.password };
        let request = self.http.request(Method::POST, self.url(LOGIN_PATH)).json(&body);
        let response = self.http.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "ERP login rejected");
            let err = ErpError::from_status_code(status).with_context("login");
            return Err(match err.category() {
                ErpErrorCategory::Authentication | ErpErrorCategory::Validation => {
                    SyncError::Auth(err.to_string())
                }
                _ => err.into(),
            });
        }

        let login: LoginResponse = response.json().await.map_err(|err| {
            SyncError::Auth(format!("login response could not be decoded: {err}"))
        })?;

        let now = self.clock.now();
        let expires_at = login
            .expiration_date
            .as_deref()
            .and_then(parse_expiration)
            .unwrap_or(now + ChronoDuration::minutes(DEFAULT_TOKEN_TTL_MINUTES));

        info!(expires_at = %expires_at, "ERP login succeeded");
        Ok(CachedToken { token: login.token, expires_at })
    }

    /// Authenticated GET; a 401 triggers one token refresh and one retry.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let url = self.url(path);

        for refreshed in [false, true] {
            let token = self.bearer().await?;
            let request =
                self.http.request(Method::GET, &url).bearer_auth(token).query(query);
            let response = self.http.send(request).await?;

            if response.status() == StatusCode::UNAUTHORIZED && !refreshed {
                debug!(%url, "token refused, logging in again");
                self.invalidate_token().await;
                continue;
            }
            return Ok(response);
        }

        Err(SyncError::Auth(format!("ERP refused a fresh token for {url}")))
    }

    /// GET and decode the body, mapping non-success statuses to errors.
    /// `Ok(None)` means the ERP answered with an empty body.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Option<Value>> {
        let response = self.get(path, query).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ErpError::from_status_code(status).with_context(path.to_string()).into());
        }

        let body = response.bytes().await.map_err(|err| {
            SyncError::from(ErpError::new(ErpErrorCategory::NetworkOffline, err.to_string()))
        })?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&body).map(Some).map_err(|err| {
            ErpError::new(ErpErrorCategory::MalformedResponse, err.to_string())
                .with_context(path.to_string())
                .into()
        })
    }
}

#[async_trait]
impl ErpGateway for ErpClient {
    #[instrument(skip(self, request), fields(entity_type = %request.entity_type, offset = request.cursor.offset()))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let query = [
            ("skip", request.cursor.offset().to_string()),
            ("top", request.page_size.to_string()),
        ];
        let body = self.get_json(&request.endpoint, &query).await?;
        let records = page_records(body, &request.endpoint)?;

        let next_cursor = (records.len() >= request.page_size && !records.is_empty())
            .then(|| request.cursor.advance(records.len()));

        debug!(records = records.len(), last = next_cursor.is_none(), "ERP page fetched");
        Ok(Page { records, next_cursor })
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn fetch_one(&self, key: &NaturalKey) -> Result<ExternalRecord> {
        let path = single_fetch_path(key)?;
        let not_found = || SyncError::NotFound(format!("{key} was not found in the ERP"));

        match self.get_json(&path, &[]).await? {
            None | Some(Value::Null) => Err(not_found()),
            Some(Value::Array(items)) => items.into_iter().next().ok_or_else(not_found),
            Some(record @ Value::Object(_)) => Ok(record),
            Some(other) => Err(SyncError::MalformedRecord(format!(
                "{path} returned {other} instead of a document"
            ))),
        }
    }
}

/// Records of a page body: a bare array or an OData-style `{ "value": [...] }`.
fn page_records(body: Option<Value>, endpoint: &str) -> Result<Vec<Value>> {
    match body {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(records)) => Ok(records),
        Some(Value::Object(mut object)) => match object.remove("value") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(ErpError::new(ErpErrorCategory::MalformedResponse, "object without a 'value' array")
                .with_context(endpoint.to_string())
                .into()),
        },
        Some(_) => Err(ErpError::new(ErpErrorCategory::MalformedResponse, "expected a JSON array")
            .with_context(endpoint.to_string())
            .into()),
    }
}

fn single_fetch_path(key: &NaturalKey) -> Result<String> {
    let parts: Vec<String> =
        key.parts.iter().map(|p| urlencoding::encode(p).into_owned()).collect();

    let path = match (key.entity_type, parts.as_slice()) {
        (EntityType::Items, [code]) => format!("/MasterData/Items/{code}"),
        (EntityType::Dispatches, [tipo, doc]) => format!("/Transaction/Orders/{tipo}/{doc}"),
        (EntityType::GoodsReceipts, [tipo, doc]) => {
            format!("/Transaction/GoodsReceipt/{tipo}/{doc}")
        }
        (EntityType::ProcurementOrders, [tipo, doc]) => {
            format!("/Transaction/ProcurementOrders/{tipo}/{doc}")
        }
        _ => return Err(SyncError::InvalidInput(format!("{key} is not a valid document key"))),
    };
    Ok(path)
}

/// The ERP emits either RFC 3339 or a naive local timestamp (taken as UTC).
fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|n| n.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_body_accepts_array_and_value_envelope() {
        let bare = page_records(Some(json!([{ "a": 1 }, { "a": 2 }])), "/x").unwrap();
        assert_eq!(bare.len(), 2);

        let wrapped = page_records(Some(json!({ "value": [{ "a": 1 }] })), "/x").unwrap();
        assert_eq!(wrapped.len(), 1);

        assert!(page_records(None, "/x").unwrap().is_empty());
        let err = page_records(Some(json!({ "items": [] })), "/x").unwrap_err();
        assert!(matches!(err, SyncError::MalformedRecord(_)));
    }

    #[test]
    fn single_fetch_paths_follow_entity_routes() {
        let dispatch = NaturalKey::new(EntityType::Dispatches, ["201", "12345"]);
        assert_eq!(single_fetch_path(&dispatch).unwrap(), "/Transaction/Orders/201/12345");

        let item = NaturalKey::new(EntityType::Items, ["A 1/2"]);
        assert_eq!(single_fetch_path(&item).unwrap(), "/MasterData/Items/A%201%2F2");

        let bad = NaturalKey::new(EntityType::GoodsReceipts, ["1"]);
        assert!(matches!(single_fetch_path(&bad), Err(SyncError::InvalidInput(_))));
    }

    #[test]
    fn expiration_parses_both_formats() {
        assert!(parse_expiration("2024-06-01T12:00:00Z").is_some());
        assert!(parse_expiration("2024-06-01T12:00:00.123").is_some());
        assert!(parse_expiration("tomorrow").is_none());
    }
}
