//! Structured logging and step-span instrumentation
//!
//! Log records are JSON lines carrying `timestamp, level, component, message`
//! plus optional `job_id, step, event, duration_ms, status, error` fields.
//! `log_step` wraps an operation and guarantees that an exit event
//! (`<step>_end` or `<step>_error`) is emitted with the measured duration,
//! on success and on failure alike.

use std::future::Future;
use std::time::Instant;
use tracing::Level;

use crate::metrics;

/// Initialize JSON tracing for a service binary.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(service_name: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .init();

    tracing::info!(component = service_name, "Logging initialized");
}

/// Emit a structured event with optional job metadata.
pub fn log_event(
    level: Level,
    message: &str,
    job_id: Option<&str>,
    step: Option<&str>,
    event: Option<&str>,
    status: Option<&str>,
) {
    if level == Level::ERROR {
        tracing::error!(job_id, step, event, status, "{}", message);
    } else if level == Level::WARN {
        tracing::warn!(job_id, step, event, status, "{}", message);
    } else {
        tracing::info!(job_id, step, event, status, "{}", message);
    }
}

/// Run a future as an instrumented step.
///
/// Emits `<step>_start` on entry and `<step>_end` (status=success) or
/// `<step>_error` on exit, with `duration_ms` in both cases, then records the
/// duration in the metrics registry. The error is propagated unchanged.
pub async fn log_step<F, T, E>(job_id: Option<&str>, step: &str, fut: F) -> std::result::Result<T, E>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let start = Instant::now();
    tracing::info!(
        job_id,
        step,
        event = %format!("{step}_start"),
        "Starting {}",
        step
    );

    let result = fut.await;
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    match &result {
        Ok(_) => {
            tracing::info!(
                job_id,
                step,
                event = %format!("{step}_end"),
                duration_ms,
                status = "success",
                "Completed {}",
                step
            );
            metrics::record_step_time(step, start.elapsed().as_secs_f64(), false);
        }
        Err(e) => {
            tracing::error!(
                job_id,
                step,
                event = %format!("{step}_error"),
                duration_ms,
                error = %e,
                "Failed {}: {}",
                step,
                e
            );
            metrics::record_step_time(step, start.elapsed().as_secs_f64(), true);
        }
    }

    result
}

/// Synchronous variant of [`log_step`] for blocking sections.
pub fn log_step_sync<F, T, E>(job_id: Option<&str>, step: &str, f: F) -> std::result::Result<T, E>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: std::fmt::Display,
{
    let start = Instant::now();
    tracing::info!(job_id, step, event = %format!("{step}_start"), "Starting {}", step);

    let result = f();
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    match &result {
        Ok(_) => {
            tracing::info!(
                job_id,
                step,
                event = %format!("{step}_end"),
                duration_ms,
                status = "success",
                "Completed {}",
                step
            );
            metrics::record_step_time(step, start.elapsed().as_secs_f64(), false);
        }
        Err(e) => {
            tracing::error!(
                job_id,
                step,
                event = %format!("{step}_error"),
                duration_ms,
                error = %e,
                "Failed {}: {}",
                step,
                e
            );
            metrics::record_step_time(step, start.elapsed().as_secs_f64(), true);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_step_success_passes_value() {
        let result: Result<u32, String> = log_step(Some("job-1"), "unit_step", async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_log_step_error_propagates() {
        let result: Result<(), String> =
            log_step(Some("job-1"), "unit_step_fail", async { Err("boom".to_string()) }).await;
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn test_log_step_sync_records_duration() {
        let result: Result<u32, String> = log_step_sync(None, "logging_test_sync_step", || Ok(7));
        assert_eq!(result.unwrap(), 7);

        let summary = metrics::summary();
        let steps = summary.get("steps").expect("steps section");
        assert!(steps.get("logging_test_sync_step").is_some());
    }
}
