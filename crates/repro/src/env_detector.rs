//! Environment detection
//!
//! Scans a cloned tree for the first-match manifest in the fixed preference
//! order requirements.txt -> environment.yml -> pyproject.toml -> Pipfile
//! and normalises it into a dependency list. All manifests found are
//! recorded even when a higher-preference one decides the type.

use arandu_common::errors::WorkerError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Version operators, longest first so `>=` never matches as `>`
const VERSION_OPERATORS: [&str; 7] = ["==", ">=", "<=", "!=", "~=", ">", "<"];

/// A single dependency with an optional version spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self { name: name.into(), version }
    }

    /// Format for a pip install command. A version spec that already carries
    /// an operator is concatenated directly; otherwise `==` is inserted.
    pub fn format_for_pip(&self) -> String {
        match &self.version {
            None => self.name.clone(),
            Some(version) => {
                if VERSION_OPERATORS.iter().any(|op| version.contains(op)) {
                    format!("{}{}", self.name, version)
                } else {
                    format!("{}=={}", self.name, version)
                }
            }
        }
    }
}

/// Environment type derived from the winning manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvType {
    Pip,
    Conda,
    Poetry,
    Pipenv,
}

impl EnvType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvType::Pip => "pip",
            EnvType::Conda => "conda",
            EnvType::Poetry => "poetry",
            EnvType::Pipenv => "pipenv",
        }
    }
}

/// Detected environment information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(rename = "type")]
    pub env_type: EnvType,
    pub dependencies: Vec<Dependency>,
    pub detected_files: Vec<String>,
    pub base_image: String,
}

impl EnvironmentInfo {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Detect the Python environment of a repository tree.
pub fn detect_environment(repo_path: &Path, job_id: &str) -> Result<EnvironmentInfo, WorkerError> {
    arandu_common::logging::log_step_sync(Some(job_id), "detect_environment", || {
        let mut detected_files: Vec<String> = Vec::new();
        let mut dependencies: Vec<Dependency> = Vec::new();
        let mut env_type: Option<EnvType> = None;

        let requirements_txt = repo_path.join("requirements.txt");
        if requirements_txt.exists() {
            detected_files.push("requirements.txt".to_string());
            env_type = Some(EnvType::Pip);
            dependencies = parse_requirements_txt(&requirements_txt)?;
            info!(count = dependencies.len(), "Detected pip environment from requirements.txt");
        }

        let environment_yml = repo_path.join("environment.yml");
        if environment_yml.exists() {
            detected_files.push("environment.yml".to_string());
            if env_type.is_none() {
                env_type = Some(EnvType::Conda);
                dependencies = parse_environment_yml(&environment_yml)?;
                info!(count = dependencies.len(), "Detected conda environment from environment.yml");
            }
        }

        let pyproject_toml = repo_path.join("pyproject.toml");
        if pyproject_toml.exists() {
            detected_files.push("pyproject.toml".to_string());
            if env_type.is_none() {
                env_type = Some(EnvType::Poetry);
                dependencies = parse_pyproject_toml(&pyproject_toml)?;
                info!(count = dependencies.len(), "Detected poetry/pip environment from pyproject.toml");
            }
        }

        let pipfile = repo_path.join("Pipfile");
        if pipfile.exists() {
            detected_files.push("Pipfile".to_string());
            if env_type.is_none() {
                env_type = Some(EnvType::Pipenv);
                dependencies = parse_pipfile(&pipfile)?;
                info!(count = dependencies.len(), "Detected pipenv environment from Pipfile");
            }
        }

        let Some(env_type) = env_type else {
            return Err(WorkerError::NoEnvironmentDetected(
                "No environment files detected. Supported: requirements.txt, environment.yml, pyproject.toml, Pipfile".to_string(),
            ));
        };

        Ok(EnvironmentInfo {
            env_type,
            dependencies,
            detected_files,
            base_image: "python:3.11-slim".to_string(),
        })
    })
}

/// Line-oriented requirements.txt parse; the operator is preserved in the
/// version string.
fn parse_requirements_txt(path: &Path) -> Result<Vec<Dependency>, WorkerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WorkerError::NoEnvironmentDetected(format!("Failed to read requirements.txt: {e}")))?;

    let mut dependencies = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let spec = match line.split_whitespace().next() {
            Some(s) => s,
            None => continue,
        };

        let mut parsed = None;
        for op in VERSION_OPERATORS {
            if let Some(pos) = spec.find(op) {
                let name = spec[..pos].trim();
                let version = spec[pos + op.len()..].trim();
                parsed = Some(Dependency::new(name, Some(format!("{op}{version}"))));
                break;
            }
        }

        dependencies.push(parsed.unwrap_or_else(|| Dependency::new(spec, None)));
    }

    Ok(dependencies)
}

/// Conda environment.yml: top-level `dependencies` list, entries either
/// `name=version` strings or nested pip blocks (flattened).
fn parse_environment_yml(path: &Path) -> Result<Vec<Dependency>, WorkerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WorkerError::NoEnvironmentDetected(format!("Failed to read environment.yml: {e}")))?;

    let data: serde_yaml::Value = serde_yaml::from_str(&content)
        .map_err(|e| WorkerError::NoEnvironmentDetected(format!("Failed to parse environment.yml: {e}")))?;

    let mut dependencies = Vec::new();
    let Some(deps) = data.get("dependencies").and_then(|d| d.as_sequence()) else {
        return Ok(dependencies);
    };

    for dep in deps {
        match dep {
            serde_yaml::Value::String(s) => {
                if let Some((name, version)) = s.split_once('=') {
                    dependencies.push(Dependency::new(name.trim(), Some(version.trim().to_string())));
                } else {
                    dependencies.push(Dependency::new(s.trim(), None));
                }
            }
            serde_yaml::Value::Mapping(map) => {
                let Some(pip_deps) = map
                    .get(serde_yaml::Value::String("pip".to_string()))
                    .and_then(|p| p.as_sequence())
                else {
                    continue;
                };
                for pip_dep in pip_deps {
                    let Some(s) = pip_dep.as_str() else { continue };
                    if let Some((name, version)) = s.split_once("==") {
                        dependencies.push(Dependency::new(name.trim(), Some(version.trim().to_string())));
                    } else {
                        dependencies.push(Dependency::new(s.trim(), None));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(dependencies)
}

/// pyproject.toml: `[tool.poetry.dependencies]` preferred (skipping
/// `python`), else PEP 621 `[project].dependencies`.
fn parse_pyproject_toml(path: &Path) -> Result<Vec<Dependency>, WorkerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WorkerError::NoEnvironmentDetected(format!("Failed to read pyproject.toml: {e}")))?;

    let data: toml::Value = content
        .parse()
        .map_err(|e| WorkerError::NoEnvironmentDetected(format!("Failed to parse pyproject.toml: {e}")))?;

    let mut dependencies = Vec::new();

    if let Some(poetry_deps) = data
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_table())
    {
        for (name, spec) in poetry_deps {
            if name == "python" {
                continue;
            }
            let version = match spec {
                toml::Value::String(s) => Some(s.clone()),
                toml::Value::Table(t) => t
                    .get("version")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                _ => None,
            };
            dependencies.push(Dependency::new(name.clone(), version));
        }
    } else if let Some(project_deps) = data
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        for dep in project_deps {
            let Some(s) = dep.as_str() else { continue };
            if let Some((name, version)) = s.split_once("==") {
                dependencies.push(Dependency::new(name.trim(), Some(version.trim().to_string())));
            } else {
                dependencies.push(Dependency::new(s.trim(), None));
            }
        }
    }

    Ok(dependencies)
}

/// Pipfile `[packages]` table
fn parse_pipfile(path: &Path) -> Result<Vec<Dependency>, WorkerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WorkerError::NoEnvironmentDetected(format!("Failed to read Pipfile: {e}")))?;

    let data: toml::Value = content
        .parse()
        .map_err(|e| WorkerError::NoEnvironmentDetected(format!("Failed to parse Pipfile: {e}")))?;

    let mut dependencies = Vec::new();
    if let Some(packages) = data.get("packages").and_then(|p| p.as_table()) {
        for (name, spec) in packages {
            let version = match spec {
                toml::Value::String(s) => Some(s.clone()),
                toml::Value::Table(t) => t
                    .get("version")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                _ => None,
            };
            dependencies.push(Dependency::new(name.clone(), version));
        }
    }

    Ok(dependencies)
}
