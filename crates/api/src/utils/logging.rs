use std::time::Duration;

use erpsync_domain::SyncError;
use tracing::{info, warn};

/// Env var switching log output to JSON lines.
pub const LOG_FORMAT_ENV: &str = "ERPSYNC_LOG_FORMAT";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Calling this twice is
/// harmless; the second install is ignored.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let fmt_layer = if json {
        fmt::layer().json().with_current_span(false).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    let _ = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init();
    info!(version = env!("CARGO_PKG_VERSION"), json, "logging initialized");
}

/// Log the outcome of a console request with structured fields.
///
/// `operation` should be a stable identifier such as `"sync::trigger"`.
#[inline]
pub fn log_operation(operation: &str, elapsed: Duration, outcome: Result<(), &SyncError>) {
    let duration_ms = elapsed.as_millis() as u64;

    match outcome {
        Ok(()) => info!(operation, duration_ms, "operation_success"),
        Err(err) => warn!(operation, duration_ms, error_kind = err.kind(), error = %err, "operation_failure"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing();
        init_tracing();
        log_operation("sync::trigger", Duration::from_millis(5), Ok(()));
        log_operation(
            "sync::trigger",
            Duration::from_millis(5),
            Err(&SyncError::Transport("down".into())),
        );
    }
}
