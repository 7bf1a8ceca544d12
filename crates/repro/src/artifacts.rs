//! Artifact generation: report, notebook, badge
//!
//! Three artifacts per successful reproduction run, written under the job's
//! artifacts directory.

use crate::env_detector::{EnvType, EnvironmentInfo};
use crate::executor::ExecutionResult;
use arandu_common::db::models::Job;
use arandu_common::errors::WorkerError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Generate the markdown reproducibility report.
pub fn generate_report(
    job: &Job,
    run: &ExecutionResult,
    env_info: &EnvironmentInfo,
    output_dir: &Path,
    job_id: &str,
) -> Result<PathBuf, WorkerError> {
    arandu_common::logging::log_step_sync(Some(job_id), "generate_report", || {
        std::fs::create_dir_all(output_dir)?;
        let report_file = output_dir.join("report.md");

        let (status, status_emoji) = if run.exit_code == 0 {
            ("✅ Success".to_string(), "✅")
        } else {
            (format!("❌ Failed (exit code: {})", run.exit_code), "❌")
        };

        let completed_at = run.started_at + chrono::Duration::milliseconds(
            (run.duration_seconds * 1000.0) as i64,
        );

        let mut lines = vec![
            "# Reproducibility Report".to_string(),
            String::new(),
            format!("**Generated:** {}", chrono::Utc::now().to_rfc3339()),
            String::new(),
            "## Job Metadata".to_string(),
            String::new(),
            format!("- **Job ID:** `{}`", job.id),
            format!("- **Repository:** {}", job.repo_url),
            format!("- **Status:** {status}"),
            format!("- **Created:** {}", job.created_at.to_rfc3339()),
            format!("- **Started:** {}", run.started_at.to_rfc3339()),
            format!("- **Completed:** {}", completed_at.to_rfc3339()),
            format!("- **Duration:** {:.2}s", run.duration_seconds),
        ];

        if let Some(arxiv_id) = &job.arxiv_id {
            lines.push(format!("- **arXiv ID:** {arxiv_id}"));
        }
        if let Some(command) = &job.run_command {
            lines.push(format!("- **Command:** `{command}`"));
        }

        lines.extend([
            String::new(),
            "## Environment Summary".to_string(),
            String::new(),
            format!("- **Type:** {}", env_info.env_type.as_str()),
            format!("- **Base Image:** {}", env_info.base_image),
            format!("- **Detected Files:** {}", env_info.detected_files.join(", ")),
            String::new(),
            "### Dependencies".to_string(),
            String::new(),
        ]);

        if env_info.dependencies.is_empty() {
            lines.push("- No dependencies detected".to_string());
        } else {
            for dep in &env_info.dependencies {
                lines.push(format!("- `{}`", dep.format_for_pip()));
            }
        }

        lines.extend([
            String::new(),
            "## Execution Results".to_string(),
            String::new(),
            format!("**Status:** {status_emoji} {status}"),
            format!("**Exit Code:** {}", run.exit_code),
            format!("**Duration:** {:.2} seconds", run.duration_seconds),
            String::new(),
            "## Logs".to_string(),
            String::new(),
            "### Standard Output".to_string(),
            String::new(),
            "```".to_string(),
            if run.stdout.is_empty() { "(no output)".to_string() } else { run.stdout.clone() },
            "```".to_string(),
            String::new(),
            "### Standard Error".to_string(),
            String::new(),
            "```".to_string(),
            if run.stderr.is_empty() { "(no errors)".to_string() } else { run.stderr.clone() },
            "```".to_string(),
            String::new(),
            "---".to_string(),
            String::new(),
            format!("*Full logs available at: {}*", run.logs_path.display()),
        ]);

        std::fs::write(&report_file, lines.join("\n"))?;
        info!(path = %report_file.display(), "Generated report");
        Ok(report_file)
    })
}

/// Generate the three-cell Jupyter notebook skeleton.
pub fn generate_notebook(
    job: &Job,
    env_info: &EnvironmentInfo,
    output_dir: &Path,
    job_id: &str,
) -> Result<PathBuf, WorkerError> {
    arandu_common::logging::log_step_sync(Some(job_id), "generate_notebook", || {
        std::fs::create_dir_all(output_dir)?;
        let notebook_file = output_dir.join("notebook.ipynb");

        let header_cell = serde_json::json!({
            "cell_type": "markdown",
            "metadata": {},
            "source": [
                "# Reproducibility Notebook\n",
                "\n",
                format!("**Repository:** {}\n", job.repo_url),
                format!("**Job ID:** `{}`\n", job.id),
            ],
        });

        let mut setup_source = vec!["# Environment Setup\n".to_string(), "\n".to_string()];
        match env_info.env_type {
            EnvType::Pip => {
                let deps: Vec<String> =
                    env_info.dependencies.iter().map(|d| d.format_for_pip()).collect();
                setup_source.push("```bash\n".to_string());
                setup_source.push(format!("pip install {}\n", deps.join(" ")));
                setup_source.push("```\n".to_string());
            }
            EnvType::Conda => {
                setup_source.push("```bash\n".to_string());
                setup_source.push("conda env create -f environment.yml\n".to_string());
                setup_source.push("conda activate <env-name>\n".to_string());
                setup_source.push("```\n".to_string());
            }
            EnvType::Poetry => {
                setup_source.push("```bash\n".to_string());
                setup_source.push("pip install poetry && poetry install\n".to_string());
                setup_source.push("```\n".to_string());
            }
            EnvType::Pipenv => {
                setup_source.push("```bash\n".to_string());
                setup_source.push("pip install pipenv && pipenv install --deploy\n".to_string());
                setup_source.push("```\n".to_string());
            }
        }
        let setup_cell = serde_json::json!({
            "cell_type": "markdown",
            "metadata": {},
            "source": setup_source,
        });

        let command = job.run_command.clone().unwrap_or_else(|| "python main.py".to_string());
        let code_cell = serde_json::json!({
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": [
                format!("# Execute: {command}\n"),
                format!("!{command}\n"),
            ],
        });

        let notebook = serde_json::json!({
            "cells": [header_cell, setup_cell, code_cell],
            "metadata": {
                "kernelspec": {
                    "display_name": "Python 3",
                    "language": "python",
                    "name": "python3",
                },
                "language_info": {
                    "name": "python",
                    "version": "3.11",
                },
                "colab": {
                    "name": "Reproducibility Notebook",
                    "provenance": [],
                },
            },
            "nbformat": 4,
            "nbformat_minor": 4,
        });

        std::fs::write(&notebook_file, serde_json::to_string_pretty(&notebook)?)?;
        info!(path = %notebook_file.display(), "Generated notebook");
        Ok(notebook_file)
    })
}

/// Generate the shields.io badge snippet.
pub fn generate_badge(
    job: &Job,
    base_url: &str,
    output_dir: &Path,
    job_id: &str,
) -> Result<PathBuf, WorkerError> {
    arandu_common::logging::log_step_sync(Some(job_id), "generate_badge", || {
        std::fs::create_dir_all(output_dir)?;
        let badge_file = output_dir.join("badge.md");

        let (status_text, color) = match job.status.as_str() {
            "completed" => ("Reproducible", "green"),
            "failed" => ("Failed", "red"),
            "running" => ("Running", "yellow"),
            _ => ("Pending", "gray"),
        };

        let job_url = format!("{base_url}/jobs/{}", job.id);
        let badge_url = format!("https://img.shields.io/badge/Reproducibility-{status_text}-{color}");
        let markdown = format!("[![{status_text}]({badge_url})]({job_url})");

        std::fs::write(&badge_file, markdown)?;
        info!(path = %badge_file.display(), "Generated badge");
        Ok(badge_file)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_detector::Dependency;
    use uuid::Uuid;

    fn fixture_job() -> Job {
        let now = chrono::Utc::now();
        Job {
            id: Uuid::new_v4(),
            repo_url: "https://github.com/user/repo".to_string(),
            arxiv_id: Some("2401.00001".to_string()),
            run_command: Some("python main.py".to_string()),
            status: "completed".to_string(),
            error_message: None,
            detected_environment: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn fixture_run() -> ExecutionResult {
        ExecutionResult {
            exit_code: 0,
            stdout: "Hello from Arandu Repro test!".to_string(),
            stderr: String::new(),
            duration_seconds: 2.5,
            logs_path: PathBuf::from("/tmp/arandu/logs/combined.log"),
            started_at: chrono::Utc::now(),
        }
    }

    fn fixture_env() -> EnvironmentInfo {
        EnvironmentInfo {
            env_type: EnvType::Pip,
            dependencies: vec![Dependency::new("numpy", Some("==1.24.0".to_string()))],
            detected_files: vec!["requirements.txt".to_string()],
            base_image: "python:3.11-slim".to_string(),
        }
    }

    #[test]
    fn test_report_contains_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path =
            generate_report(&fixture_job(), &fixture_run(), &fixture_env(), dir.path(), "j").unwrap();
        let content = std::fs::read_to_string(path).unwrap();

        assert!(content.contains("# Reproducibility Report"));
        assert!(content.contains("## Environment Summary"));
        assert!(content.contains("✅ Success"));
        assert!(content.contains("`numpy==1.24.0`"));
        assert!(content.contains("Hello from Arandu Repro test!"));
        assert!(content.contains("*Full logs available at:"));
    }

    #[test]
    fn test_report_failed_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = fixture_run();
        run.exit_code = 2;
        run.stderr = "Traceback".to_string();
        let path =
            generate_report(&fixture_job(), &run, &fixture_env(), dir.path(), "j").unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("❌ Failed (exit code: 2)"));
        assert!(content.contains("Traceback"));
    }

    #[test]
    fn test_notebook_is_valid_three_cell_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = generate_notebook(&fixture_job(), &fixture_env(), dir.path(), "j").unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        let cells = parsed["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0]["cell_type"], "markdown");
        assert_eq!(cells[1]["cell_type"], "markdown");
        assert_eq!(cells[2]["cell_type"], "code");
        assert_eq!(parsed["nbformat"], 4);

        let code_source = cells[2]["source"].as_array().unwrap();
        assert!(code_source[1].as_str().unwrap().starts_with("!python main.py"));
    }

    #[test]
    fn test_badge_reflects_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = generate_badge(&fixture_job(), "http://localhost:8000", dir.path(), "j").unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Reproducibility-Reproducible-green"));
        assert!(content.contains("/jobs/"));

        let mut job = fixture_job();
        job.status = "failed".to_string();
        let path = generate_badge(&job, "http://localhost:8000", dir.path(), "j").unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Reproducibility-Failed-red"));
    }
}
