//! Structured logging configuration.
//!
//! Log output goes to stderr so command results on stdout stay parseable.
//! Records emitted through the `log` facade by the library are captured too.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Commands slower than this are logged at warn level
const SLOW_COMMAND_MS: u64 = 1000;

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var
/// (default: `info,sqlx=warn`).
///
/// # Example
///
/// ```no_run
/// # mod logging { pub fn init() {} }
/// logging::init();
/// tracing::info!("Console starting");
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Structured logging initialized");
}

/// Log the outcome of one economy command
///
/// # Arguments
///
/// * `action` - Command name
/// * `duration_ms` - Duration in milliseconds
/// * `status_code` - Status hint of the result (200 on success)
pub fn log_command(action: &str, duration_ms: u64, status_code: u16) {
    if status_code >= 500 {
        tracing::error!(
            action = action,
            duration_ms = duration_ms,
            status = status_code,
            "Command failed"
        );
    } else if duration_ms > SLOW_COMMAND_MS {
        tracing::warn!(
            action = action,
            duration_ms = duration_ms,
            status = status_code,
            "Slow command"
        );
    } else {
        tracing::info!(
            action = action,
            duration_ms = duration_ms,
            status = status_code,
            "Command completed"
        );
    }
}
