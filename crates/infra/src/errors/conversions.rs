//! Conversions from external infrastructure errors into domain errors.

use erpsync_domain::SyncError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SyncError);

impl From<InfraError> for SyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SyncError> for InfraError {
    fn from(value: SyncError) -> Self {
        InfraError(value)
    }
}

trait IntoSyncError {
    fn into_sync_error(self) -> SyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl IntoSyncError for SqlError {
    fn into_sync_error(self) -> SyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => SyncError::Storage("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        SyncError::Storage("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        SyncError::Storage("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        SyncError::Storage("foreign key constraint violation".into())
                    }
                    (ErrorCode::DiskFull, _) => SyncError::Storage("disk is full".into()),
                    _ => SyncError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => SyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                SyncError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                SyncError::Storage(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => {
                SyncError::Config(format!("invalid database path: {}", path.to_string_lossy()))
            }
            RE::InvalidQuery => SyncError::Internal("invalid SQL query".into()),
            other => SyncError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_sync_error())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(SyncError::Storage(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(SyncError::Storage(format!("stored JSON is invalid: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl IntoSyncError for HttpError {
    fn into_sync_error(self) -> SyncError {
        if self.is_timeout() {
            return SyncError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SyncError::Transport("HTTP connection failure".into());
        }

        if self.is_decode() {
            return SyncError::MalformedRecord(format!("response body could not be decoded: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => SyncError::Auth(message),
                404 => SyncError::NotFound(message),
                429 => SyncError::RateLimited(message),
                400..=499 => SyncError::InvalidInput(message),
                _ => SyncError::Transport(message),
            };
        }

        SyncError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_sync_error())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_retryable_storage_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: SyncError = InfraError::from(err).into();
        match &mapped {
            SyncError::Storage(msg) => assert!(msg.contains("busy")),
            other => panic!("expected storage error, got {other:?}"),
        }
        assert!(mapped.is_retryable());
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: SyncError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, SyncError::NotFound(_)));
    }

    async fn status_error(status: StatusCode) -> HttpError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err()
    }

    #[tokio::test]
    async fn http_status_codes_map_to_taxonomy() {
        let auth: SyncError = InfraError::from(status_error(StatusCode::UNAUTHORIZED).await).into();
        assert!(matches!(auth, SyncError::Auth(ref m) if m.contains("401")));

        let missing: SyncError = InfraError::from(status_error(StatusCode::NOT_FOUND).await).into();
        assert!(matches!(missing, SyncError::NotFound(_)));

        let throttled: SyncError =
            InfraError::from(status_error(StatusCode::TOO_MANY_REQUESTS).await).into();
        assert!(matches!(throttled, SyncError::RateLimited(_)));

        let down: SyncError = InfraError::from(status_error(StatusCode::BAD_GATEWAY).await).into();
        assert!(matches!(down, SyncError::Transport(_)));
    }
}
