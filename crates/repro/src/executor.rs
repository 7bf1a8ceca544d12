//! Sandboxed command execution
//!
//! Runs the user command inside the per-job image under non-negotiable
//! constraints: non-root identity, bounded CPU and memory, isolated
//! network, and exactly two mounts (repo read-only at /workspace,
//! artifacts read-write at /artifacts). Preflight violations raise
//! ExecutionError before any container exists.

use arandu_common::config::{DockerConfig, ExecutionConfig};
use arandu_common::errors::WorkerError;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Result of a sandboxed command execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Truncated preview for database storage
    pub stdout: String,
    /// Truncated preview for database storage
    pub stderr: String,
    pub duration_seconds: f64,
    /// Path to the combined untruncated log
    pub logs_path: PathBuf,
    /// Actual moment of container launch
    pub started_at: DateTime<Utc>,
}

/// Security preconditions checked before any container is launched.
pub fn preflight(config: &DockerConfig) -> Result<(), WorkerError> {
    if config.user.is_empty() || config.user == "root" || config.user == "0" {
        return Err(WorkerError::Execution(format!(
            "refusing to run container as root user: {:?}",
            config.user
        )));
    }
    if config.user_uid == 0 {
        return Err(WorkerError::Execution(
            "refusing to run container with UID 0".to_string(),
        ));
    }
    if config.cpu_limit <= 0.0 {
        return Err(WorkerError::Execution(format!(
            "CPU limit must be positive, got {}",
            config.cpu_limit
        )));
    }
    if config.memory_limit.trim().is_empty() {
        return Err(WorkerError::Execution("memory limit must be set".to_string()));
    }
    if !matches!(config.network_mode.as_str(), "none" | "bridge") {
        return Err(WorkerError::Execution(format!(
            "network mode must be 'none' or 'bridge', got {:?}",
            config.network_mode
        )));
    }
    Ok(())
}

/// Parse a memory limit string (`4g`, `512m`, `64k`, or raw bytes) to bytes.
pub fn parse_memory_limit(memory: &str) -> Result<i64, WorkerError> {
    let memory = memory.trim().to_lowercase();
    let (number, multiplier) = if let Some(stripped) = memory.strip_suffix('g') {
        (stripped, 1024 * 1024 * 1024)
    } else if let Some(stripped) = memory.strip_suffix('m') {
        (stripped, 1024 * 1024)
    } else if let Some(stripped) = memory.strip_suffix('k') {
        (stripped, 1024)
    } else {
        (memory.as_str(), 1)
    };

    let value: f64 = number
        .parse()
        .map_err(|_| WorkerError::Execution(format!("invalid memory limit: {memory:?}")))?;
    Ok((value * multiplier as f64) as i64)
}

/// Truncate log content to a byte budget, preserving UTF-8 boundaries, and
/// append a truncation marker when anything was removed.
pub fn truncate_log(content: &str, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content.to_string();
    }

    let mut end = max_bytes;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... [truncated]", &content[..end])
}

/// Execute a command in the job image and capture its output.
#[allow(clippy::too_many_arguments)]
pub async fn execute_command(
    docker: &Docker,
    image_tag: &str,
    command: &str,
    repo_path: &Path,
    artifacts_dir: &Path,
    docker_config: &DockerConfig,
    execution_config: &ExecutionConfig,
    job_id: &str,
    timeout_seconds: Option<u64>,
) -> Result<ExecutionResult, WorkerError> {
    let timeout_seconds = timeout_seconds.unwrap_or(execution_config.default_timeout_seconds);

    arandu_common::logging::log_step(Some(job_id), "execute_command", async {
        preflight(docker_config)?;

        std::fs::create_dir_all(artifacts_dir)
            .map_err(|e| WorkerError::Execution(format!("cannot create artifacts dir: {e}")))?;
        let logs_file = artifacts_dir.join("logs").join("combined.log");
        std::fs::create_dir_all(logs_file.parent().expect("logs dir has a parent"))
            .map_err(|e| WorkerError::Execution(format!("cannot create logs dir: {e}")))?;

        let cpu_quota = (docker_config.cpu_limit * 1_000_000_000.0) as i64;
        let cpu_period = 1_000_000;
        let memory_bytes = parse_memory_limit(&docker_config.memory_limit)?;

        info!(
            user = %docker_config.user,
            cpu = docker_config.cpu_limit,
            memory = %docker_config.memory_limit,
            network = %docker_config.network_mode,
            "Running container with security constraints"
        );

        let host_config = HostConfig {
            cpu_quota: Some(cpu_quota),
            cpu_period: Some(cpu_period),
            memory: Some(memory_bytes),
            network_mode: Some(docker_config.network_mode.clone()),
            readonly_rootfs: Some(docker_config.readonly_rootfs),
            binds: Some(vec![
                format!("{}:/workspace:ro", repo_path.display()),
                format!("{}:/artifacts:rw", artifacts_dir.display()),
            ]),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(image_tag.to_string()),
            cmd: Some(vec!["/bin/sh".to_string(), "-c".to_string(), command.to_string()]),
            user: Some(docker_config.user.clone()),
            working_dir: Some("/workspace".to_string()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let container_name = format!("arandu-run-{job_id}");
        docker
            .create_container(
                Some(CreateContainerOptions { name: container_name.clone(), platform: None }),
                container_config,
            )
            .await
            .map_err(|e| WorkerError::Execution(format!("container create failed: {e}")))?;

        let started_at = Utc::now();
        let start_instant = Instant::now();
        if let Err(e) = docker
            .start_container(&container_name, None::<StartContainerOptions<String>>)
            .await
        {
            remove_container(docker, &container_name).await;
            return Err(WorkerError::Execution(format!("container start failed: {e}")));
        }

        // Wait for exit within the budget; on timeout, cooperative stop then
        // surface the timeout.
        let mut wait_stream =
            docker.wait_container(&container_name, None::<WaitContainerOptions<String>>);
        let wait_result = tokio::time::timeout(
            std::time::Duration::from_secs(timeout_seconds),
            wait_stream.next(),
        )
        .await;

        let exit_code: i32 = match wait_result {
            Err(_) => {
                warn!(job_id, timeout_seconds, "Container exceeded timeout, stopping");
                let _ = docker
                    .stop_container(&container_name, Some(StopContainerOptions { t: 5 }))
                    .await;
                remove_container(docker, &container_name).await;
                return Err(WorkerError::ExecutionTimeout(timeout_seconds));
            }
            Ok(None) => {
                remove_container(docker, &container_name).await;
                return Err(WorkerError::Execution(
                    "container wait ended without a status".to_string(),
                ));
            }
            Ok(Some(Ok(response))) => response.status_code as i32,
            Ok(Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. }))) => {
                code as i32
            }
            Ok(Some(Err(e))) => {
                remove_container(docker, &container_name).await;
                return Err(WorkerError::Execution(format!("container wait failed: {e}")));
            }
        };

        let stdout = collect_logs(docker, &container_name, true, false).await;
        let stderr = collect_logs(docker, &container_name, false, true).await;

        let combined = format!("=== STDOUT ===\n{stdout}\n=== STDERR ===\n{stderr}");
        std::fs::write(&logs_file, combined)
            .map_err(|e| WorkerError::Execution(format!("cannot write combined log: {e}")))?;

        let half_budget = execution_config.max_log_size_bytes / 2;
        let stdout_preview = truncate_log(&stdout, half_budget);
        let stderr_preview = truncate_log(&stderr, half_budget);

        let duration_seconds = start_instant.elapsed().as_secs_f64();

        remove_container(docker, &container_name).await;

        info!(
            job_id,
            exit_code,
            duration_seconds,
            logs_path = %logs_file.display(),
            "Execution completed"
        );

        Ok(ExecutionResult {
            exit_code,
            stdout: stdout_preview,
            stderr: stderr_preview,
            duration_seconds,
            logs_path: logs_file,
            started_at,
        })
    })
    .await
}

async fn collect_logs(docker: &Docker, container: &str, stdout: bool, stderr: bool) -> String {
    let options = LogsOptions::<String> {
        stdout,
        stderr,
        follow: false,
        ..Default::default()
    };

    let mut output = Vec::new();
    let mut stream = docker.logs(container, Some(options));
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(log) => output.extend_from_slice(&log.into_bytes()),
            Err(e) => {
                warn!(container, error = %e, "Log read failed");
                break;
            }
        }
    }
    String::from_utf8_lossy(&output).into_owned()
}

async fn remove_container(docker: &Docker, container: &str) {
    let options = RemoveContainerOptions { force: true, ..Default::default() };
    if let Err(e) = docker.remove_container(container, Some(options)).await {
        warn!(container, error = %e, "Failed to remove container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox_config() -> DockerConfig {
        DockerConfig::default()
    }

    #[test]
    fn test_preflight_accepts_default() {
        assert!(preflight(&sandbox_config()).is_ok());
    }

    #[test]
    fn test_preflight_rejects_root_user() {
        let mut config = sandbox_config();
        config.user = "root".to_string();
        assert!(preflight(&config).is_err());

        let mut config = sandbox_config();
        config.user = "0".to_string();
        assert!(preflight(&config).is_err());
    }

    #[test]
    fn test_preflight_rejects_uid_zero() {
        let mut config = sandbox_config();
        config.user_uid = 0;
        assert!(preflight(&config).is_err());
    }

    #[test]
    fn test_preflight_rejects_zero_cpu() {
        let mut config = sandbox_config();
        config.cpu_limit = 0.0;
        assert!(preflight(&config).is_err());
    }

    #[test]
    fn test_preflight_rejects_empty_memory() {
        let mut config = sandbox_config();
        config.memory_limit = "  ".to_string();
        assert!(preflight(&config).is_err());
    }

    #[test]
    fn test_preflight_rejects_host_network() {
        let mut config = sandbox_config();
        config.network_mode = "host".to_string();
        assert!(preflight(&config).is_err());

        let mut config = sandbox_config();
        config.network_mode = "bridge".to_string();
        assert!(preflight(&config).is_ok());
    }

    #[test]
    fn test_parse_memory_limit_suffixes() {
        assert_eq!(parse_memory_limit("4g").unwrap(), 4 * 1024 * 1024 * 1024);
        assert_eq!(parse_memory_limit("512m").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_memory_limit("64k").unwrap(), 64 * 1024);
        assert_eq!(parse_memory_limit("1024").unwrap(), 1024);
        assert_eq!(parse_memory_limit("1.5g").unwrap(), 1024 * 1024 * 1024 * 3 / 2);
    }

    #[test]
    fn test_parse_memory_limit_rejects_garbage() {
        assert!(parse_memory_limit("lots").is_err());
        assert!(parse_memory_limit("").is_err());
    }

    #[test]
    fn test_truncate_log_short_content_untouched() {
        assert_eq!(truncate_log("hello", 100), "hello");
    }

    #[test]
    fn test_truncate_log_fits_budget_and_marks() {
        let content = "x".repeat(100);
        let truncated = truncate_log(&content, 10);
        assert!(truncated.ends_with("... [truncated]"));
        let body = truncated.strip_suffix("\n... [truncated]").unwrap();
        assert!(body.len() <= 10);
    }

    #[test]
    fn test_truncate_log_preserves_utf8() {
        // Multi-byte characters must not be split.
        let content = "héllo wörld ".repeat(50);
        for budget in 1..40 {
            let truncated = truncate_log(&content, budget);
            let body = truncated.strip_suffix("\n... [truncated]").unwrap();
            assert!(body.len() <= budget);
            assert!(std::str::from_utf8(body.as_bytes()).is_ok());
        }
    }
}
