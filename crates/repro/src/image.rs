//! Docker image construction
//!
//! Generates a Dockerfile from the detected environment, ships the repo tree
//! as a tar build context, and builds a per-job image tagged
//! `arandu-job-<job_id>:latest`. Build failures surface as DockerBuildError;
//! image removal is forced on cleanup.

use crate::env_detector::{EnvType, EnvironmentInfo};
use arandu_common::config::DockerConfig;
use arandu_common::errors::WorkerError;
use bollard::image::{BuildImageOptions, RemoveImageOptions};
use bollard::Docker;
use futures::StreamExt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the generated Dockerfile inside the repo tree
pub const DOCKERFILE_NAME: &str = "Dockerfile.arandu";

/// Connect to the container runtime socket.
pub fn connect_docker(socket: &str) -> Result<Docker, WorkerError> {
    let path = socket.strip_prefix("unix://").unwrap_or(socket);
    Docker::connect_with_socket(path, 120, bollard::API_DEFAULT_VERSION)
        .map_err(|e| WorkerError::Execution(format!("Cannot connect to Docker: {e}")))
}

/// Image tag for a job
pub fn image_tag(job_id: &str) -> String {
    format!("{}{}:latest", arandu_common::JOB_IMAGE_PREFIX, job_id)
}

/// Build the per-job image. Returns the image tag.
pub async fn build_image(
    docker: &Docker,
    repo_path: &Path,
    env_info: &EnvironmentInfo,
    docker_config: &DockerConfig,
    job_id: &str,
) -> Result<String, WorkerError> {
    arandu_common::logging::log_step(Some(job_id), "build_docker_image", async {
        let tag = image_tag(job_id);

        let dockerfile = generate_dockerfile(env_info, docker_config);
        let dockerfile_path = repo_path.join(DOCKERFILE_NAME);
        std::fs::write(&dockerfile_path, &dockerfile)
            .map_err(|e| WorkerError::DockerBuild(format!("Cannot write Dockerfile: {e}")))?;
        info!(path = %dockerfile_path.display(), "Generated Dockerfile");

        let context = build_context(repo_path)
            .map_err(|e| WorkerError::DockerBuild(format!("Cannot create build context: {e}")))?;

        let options = BuildImageOptions::<String> {
            dockerfile: DOCKERFILE_NAME.to_string(),
            t: tag.clone(),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        info!(tag = %tag, "Building Docker image");
        let mut stream = docker.build_image(options, None, Some(context.into()));
        while let Some(message) = stream.next().await {
            let info = message.map_err(|e| WorkerError::DockerBuild(format!("Docker build failed: {e}")))?;
            if let Some(error) = info.error {
                return Err(WorkerError::DockerBuild(format!("Docker build failed: {error}")));
            }
            if let Some(line) = info.stream {
                let line = line.trim();
                if !line.is_empty() {
                    debug!(build = %line, "Docker build output");
                }
            }
        }

        info!(tag = %tag, "Successfully built image");
        Ok(tag)
    })
    .await
}

/// Tar the repo tree as the build context
fn build_context(repo_path: &Path) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", repo_path)?;
    builder.into_inner()
}

/// Generate the Dockerfile content for an environment.
pub fn generate_dockerfile(env_info: &EnvironmentInfo, docker_config: &DockerConfig) -> String {
    let user = &docker_config.user;
    let uid = docker_config.user_uid;

    let mut lines = vec![
        format!("FROM {}", env_info.base_image),
        String::new(),
        "# Create non-root user".to_string(),
        format!("RUN useradd -m -u {uid} {user}"),
        String::new(),
        "WORKDIR /workspace".to_string(),
        String::new(),
    ];

    match env_info.env_type {
        EnvType::Pip => {
            let deps: Vec<String> =
                env_info.dependencies.iter().map(|d| d.format_for_pip()).collect();
            if !deps.is_empty() {
                lines.push("# Install Python dependencies".to_string());
                lines.push(format!("RUN pip install --no-cache-dir {}", deps.join(" ")));
                lines.push(String::new());
            }
        }
        EnvType::Conda => {
            // No conda in the slim base image: install the flattened list
            // through pip instead.
            let deps: Vec<String> = env_info
                .dependencies
                .iter()
                .map(|d| match &d.version {
                    Some(version) => {
                        let version = version.rsplit('=').next().unwrap_or(version);
                        if version.is_empty() {
                            d.name.clone()
                        } else {
                            format!("{}=={}", d.name, version)
                        }
                    }
                    None => d.name.clone(),
                })
                .collect();
            if !deps.is_empty() {
                lines.push("# Install conda dependencies via pip".to_string());
                lines.push(format!("RUN pip install --no-cache-dir {}", deps.join(" ")));
                lines.push(String::new());
            }
        }
        EnvType::Poetry => {
            lines.push("# Install Poetry dependencies".to_string());
            lines.push("RUN pip install poetry".to_string());
            lines.push("COPY pyproject.toml .".to_string());
            lines.push("RUN poetry install --no-dev".to_string());
            lines.push(String::new());
        }
        EnvType::Pipenv => {
            lines.push("# Install Pipenv dependencies".to_string());
            lines.push("RUN pip install pipenv".to_string());
            lines.push("COPY Pipfile Pipfile.lock* ./".to_string());
            lines.push("RUN pipenv install --deploy".to_string());
            lines.push(String::new());
        }
    }

    lines.push("# Copy repository files".to_string());
    lines.push("COPY . .".to_string());
    lines.push(String::new());
    lines.push(format!("RUN chown -R {user}:{user} /workspace"));
    lines.push(String::new());
    lines.push(format!("USER {user}"));
    lines.push(String::new());
    lines.push("CMD [\"python\", \"--version\"]".to_string());

    lines.join("\n")
}

/// Remove the per-job image. Failures are logged, not raised.
pub async fn cleanup_image(docker: &Docker, tag: &str, job_id: &str) {
    let options = RemoveImageOptions { force: true, ..Default::default() };
    match docker.remove_image(tag, Some(options), None).await {
        Ok(_) => info!(job_id, tag, "Removed Docker image"),
        Err(e) => warn!(job_id, tag, error = %e, "Failed to remove Docker image"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_detector::Dependency;

    fn pip_env() -> EnvironmentInfo {
        EnvironmentInfo {
            env_type: EnvType::Pip,
            dependencies: vec![
                Dependency::new("numpy", Some("==1.24.0".to_string())),
                Dependency::new("pandas", Some(">=2.0".to_string())),
                Dependency::new("requests", None),
            ],
            detected_files: vec!["requirements.txt".to_string()],
            base_image: "python:3.11-slim".to_string(),
        }
    }

    #[test]
    fn test_image_tag_embeds_job_id() {
        assert_eq!(image_tag("abc-123"), "arandu-job-abc-123:latest");
    }

    #[test]
    fn test_dockerfile_pip_install_line() {
        let dockerfile = generate_dockerfile(&pip_env(), &Default::default());
        assert!(dockerfile.contains("FROM python:3.11-slim"));
        assert!(dockerfile.contains("RUN useradd -m -u 1000 arandu-user"));
        assert!(dockerfile.contains("WORKDIR /workspace"));
        assert!(dockerfile
            .contains("RUN pip install --no-cache-dir numpy==1.24.0 pandas>=2.0 requests"));
        assert!(dockerfile.contains("RUN chown -R arandu-user:arandu-user /workspace"));
        assert!(dockerfile.contains("USER arandu-user"));
        assert!(dockerfile.contains("CMD [\"python\", \"--version\"]"));
    }

    #[test]
    fn test_dockerfile_order() {
        let dockerfile = generate_dockerfile(&pip_env(), &Default::default());
        let copy_pos = dockerfile.find("COPY . .").unwrap();
        let chown_pos = dockerfile.find("RUN chown").unwrap();
        let user_pos = dockerfile.find("USER arandu-user").unwrap();
        assert!(copy_pos < chown_pos && chown_pos < user_pos);
    }

    #[test]
    fn test_dockerfile_conda_flattens_versions() {
        let env = EnvironmentInfo {
            env_type: EnvType::Conda,
            dependencies: vec![
                Dependency::new("numpy", Some("1.24.0".to_string())),
                Dependency::new("scipy", None),
            ],
            detected_files: vec!["environment.yml".to_string()],
            base_image: "python:3.11-slim".to_string(),
        };
        let dockerfile = generate_dockerfile(&env, &Default::default());
        assert!(dockerfile.contains("numpy==1.24.0 scipy"));
    }

    #[test]
    fn test_dockerfile_poetry_uses_tool_install() {
        let env = EnvironmentInfo {
            env_type: EnvType::Poetry,
            dependencies: vec![],
            detected_files: vec!["pyproject.toml".to_string()],
            base_image: "python:3.11-slim".to_string(),
        };
        let dockerfile = generate_dockerfile(&env, &Default::default());
        assert!(dockerfile.contains("RUN pip install poetry"));
        assert!(dockerfile.contains("COPY pyproject.toml ."));
        assert!(dockerfile.contains("RUN poetry install --no-dev"));
    }

    #[test]
    fn test_build_context_contains_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')").unwrap();
        let context = build_context(dir.path()).unwrap();
        assert!(!context.is_empty());
    }
}
