//! Reproducibility method checklist
//!
//! A fixed seven-item checklist evaluated with deterministic rules over the
//! paper text and, when available, a cloned repository tree.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Checklist item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Ok,
    Partial,
    Missing,
}

/// Where the evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    Paper,
    Repo,
}

/// A single checklist item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub key: String,
    pub status: ItemStatus,
    pub evidence: Option<String>,
    pub source: EvidenceSource,
}

/// Complete checklist for a review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub items: Vec<ChecklistItem>,
    pub summary: String,
}

impl Checklist {
    /// Fraction of items with status ok
    pub fn pct_ok(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        let ok = self.items.iter().filter(|i| i.status == ItemStatus::Ok).count();
        ok as f64 / self.items.len() as f64
    }

    /// Critical items (data, seeds, environment, commands) that are missing
    pub fn critical_missing(&self) -> usize {
        const CRITICAL: [&str; 4] = ["data_available", "seeds_fixed", "environment", "commands"];
        self.items
            .iter()
            .filter(|i| CRITICAL.contains(&i.key.as_str()) && i.status == ItemStatus::Missing)
            .count()
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static checklist regex")
}

fn check_data_available(paper_text: &str, repo_path: Option<&Path>) -> ChecklistItem {
    let mut status = ItemStatus::Missing;
    let mut evidence = None;
    let mut source = EvidenceSource::Paper;

    let data_patterns = [
        r"(?i)dataset[:\s]+(?:https?://|www\.)",
        r"(?i)data[:\s]+(?:available|provided|download)",
        r"(?i)https?://\S+(?:data|dataset)",
    ];
    for pattern in data_patterns {
        if let Some(m) = re(pattern).find(paper_text) {
            evidence = Some(m.as_str().to_string());
            status = ItemStatus::Ok;
            break;
        }
    }

    if let Some(repo) = repo_path {
        for data_dir in ["data", "datasets", "data_files"] {
            if repo.join(data_dir).exists() {
                if status == ItemStatus::Missing {
                    status = ItemStatus::Ok;
                }
                evidence = Some(format!("Found {data_dir}/ directory in repo"));
                source = EvidenceSource::Repo;
                break;
            }
        }

        if status == ItemStatus::Missing {
            if let Ok(readme) = std::fs::read_to_string(repo.join("README.md")) {
                if re(r"(?i)data|dataset").is_match(&readme) {
                    status = ItemStatus::Partial;
                    evidence = Some("README mentions data".to_string());
                    source = EvidenceSource::Repo;
                }
            }
        }
    }

    ChecklistItem { key: "data_available".into(), status, evidence, source }
}

fn check_seeds_fixed(paper_text: &str, repo_path: Option<&Path>) -> ChecklistItem {
    let mut status = ItemStatus::Missing;
    let mut evidence = None;
    let mut source = EvidenceSource::Paper;

    let seed_patterns = [
        r"(?i)seed[:\s]+\d+",
        r"(?i)random[_\s]?state[:\s]+\d+",
        r"(?i)random[_\s]?seed[:\s]+\d+",
    ];
    for pattern in seed_patterns {
        if let Some(m) = re(pattern).find(paper_text) {
            evidence = Some(m.as_str().to_string());
            status = ItemStatus::Ok;
            break;
        }
    }

    if status == ItemStatus::Missing {
        if let Some(repo) = repo_path {
            let seed_re = re(r"seed\s*=\s*\d+|random_state\s*=\s*\d+");
            let python_files = walkdir::WalkDir::new(repo)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().map(|x| x == "py").unwrap_or(false))
                .take(10);
            for entry in python_files {
                if let Ok(content) = std::fs::read_to_string(entry.path()) {
                    if seed_re.is_match(&content) {
                        status = ItemStatus::Ok;
                        evidence = Some(format!(
                            "Found seed setting in {}",
                            entry.path().file_name().unwrap_or_default().to_string_lossy()
                        ));
                        source = EvidenceSource::Repo;
                        break;
                    }
                }
            }
        }
    }

    ChecklistItem { key: "seeds_fixed".into(), status, evidence, source }
}

fn check_environment_files(repo_path: Option<&Path>) -> ChecklistItem {
    let Some(repo) = repo_path else {
        return ChecklistItem {
            key: "environment".into(),
            status: ItemStatus::Missing,
            evidence: None,
            source: EvidenceSource::Repo,
        };
    };

    let env_files = ["requirements.txt", "environment.yml", "pyproject.toml", "Pipfile", "setup.py"];
    let found: Vec<&str> = env_files.iter().copied().filter(|f| repo.join(f).exists()).collect();

    if found.is_empty() {
        ChecklistItem {
            key: "environment".into(),
            status: ItemStatus::Missing,
            evidence: None,
            source: EvidenceSource::Repo,
        }
    } else {
        ChecklistItem {
            key: "environment".into(),
            status: ItemStatus::Ok,
            evidence: Some(format!("Found: {}", found.join(", "))),
            source: EvidenceSource::Repo,
        }
    }
}

fn check_commands_available(paper_text: &str, repo_path: Option<&Path>) -> ChecklistItem {
    let mut status = ItemStatus::Missing;
    let mut evidence = None;
    let mut source = EvidenceSource::Paper;

    let command_patterns = [r"(?i)(?:run|execute|command)[:\s]+(?:python|bash|sh)", r"(?i)python\s+[a-z_]+\.py"];
    for pattern in command_patterns {
        if re(pattern).is_match(paper_text) {
            status = ItemStatus::Partial;
            evidence = Some("Paper mentions execution commands".to_string());
            break;
        }
    }

    if let Some(repo) = repo_path {
        if let Ok(readme) = std::fs::read_to_string(repo.join("README.md")) {
            if re(r"(?i)python|run|execute|usage").is_match(&readme) {
                status = if status == ItemStatus::Missing { ItemStatus::Ok } else { ItemStatus::Partial };
                evidence = Some("README contains execution instructions".to_string());
                source = EvidenceSource::Repo;
            }
        }
    }

    ChecklistItem { key: "commands".into(), status, evidence, source }
}

fn check_metrics_defined(paper_text: &str) -> ChecklistItem {
    let metric_re = re(r"(?i)accuracy|precision|recall|f1|f-score|auroc|auc|roc");
    let (status, evidence) = match metric_re.find(paper_text) {
        Some(m) => (ItemStatus::Ok, Some(m.as_str().to_string())),
        None => (ItemStatus::Missing, None),
    };
    ChecklistItem { key: "metrics".into(), status, evidence, source: EvidenceSource::Paper }
}

fn check_comparatives(paper_text: &str) -> ChecklistItem {
    let mut status = ItemStatus::Missing;
    let mut evidence = None;

    let baseline_patterns =
        [r"(?i)baselines?", r"(?i)compared\s+to", r"(?i)versus|vs\.", r"(?i)state-of-the-art|SOTA"];
    for pattern in baseline_patterns {
        if re(pattern).is_match(paper_text) {
            status = ItemStatus::Partial;
            evidence = Some("Paper mentions baselines/comparisons".to_string());
            break;
        }
    }

    if re(r"(?i)(?:BERT|GPT|ResNet|VGG)\s+(?:baseline|comparison)").is_match(paper_text) {
        status = ItemStatus::Ok;
        evidence = Some("Paper names specific baselines".to_string());
    }

    ChecklistItem { key: "comparatives".into(), status, evidence, source: EvidenceSource::Paper }
}

fn check_license(repo_path: Option<&Path>) -> ChecklistItem {
    let Some(repo) = repo_path else {
        return ChecklistItem {
            key: "license".into(),
            status: ItemStatus::Missing,
            evidence: None,
            source: EvidenceSource::Repo,
        };
    };

    for license_file in ["LICENSE", "LICENSE.txt", "LICENSE.md", "COPYING"] {
        if repo.join(license_file).exists() {
            return ChecklistItem {
                key: "license".into(),
                status: ItemStatus::Ok,
                evidence: Some(format!("Found {license_file}")),
                source: EvidenceSource::Repo,
            };
        }
    }

    if let Ok(readme) = std::fs::read_to_string(repo.join("README.md")) {
        if re(r"(?i)license|licence").is_match(&readme) {
            return ChecklistItem {
                key: "license".into(),
                status: ItemStatus::Partial,
                evidence: Some("License mentioned in README".to_string()),
                source: EvidenceSource::Repo,
            };
        }
    }

    ChecklistItem {
        key: "license".into(),
        status: ItemStatus::Missing,
        evidence: None,
        source: EvidenceSource::Repo,
    }
}

/// Generate the full seven-item checklist.
pub fn generate_checklist(paper_text: &str, repo_path: Option<&Path>) -> Checklist {
    let items = vec![
        check_data_available(paper_text, repo_path),
        check_seeds_fixed(paper_text, repo_path),
        check_environment_files(repo_path),
        check_commands_available(paper_text, repo_path),
        check_metrics_defined(paper_text),
        check_comparatives(paper_text),
        check_license(repo_path),
    ];

    let ok = items.iter().filter(|i| i.status == ItemStatus::Ok).count();
    let partial = items.iter().filter(|i| i.status == ItemStatus::Partial).count();
    let missing = items.iter().filter(|i| i.status == ItemStatus::Missing).count();
    let summary = format!("Checklist: {ok} OK, {partial} partial, {missing} missing");

    Checklist { items, summary }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checklist_has_seven_items_in_order() {
        let checklist = generate_checklist("plain text", None);
        let keys: Vec<&str> = checklist.items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "data_available",
                "seeds_fixed",
                "environment",
                "commands",
                "metrics",
                "comparatives",
                "license"
            ]
        );
    }

    #[test]
    fn test_empty_inputs_mostly_missing() {
        let checklist = generate_checklist("nothing relevant here", None);
        let missing = checklist.items.iter().filter(|i| i.status == ItemStatus::Missing).count();
        assert!(missing >= 5);
        assert!(checklist.summary.contains("missing"));
    }

    #[test]
    fn test_paper_signals_detected() {
        let text = "Dataset: https://example.org/data with seed: 42. We report accuracy and F1 \
                    compared to baselines. Run: python train.py";
        let checklist = generate_checklist(text, None);
        let by_key = |key: &str| checklist.items.iter().find(|i| i.key == key).unwrap();

        assert_eq!(by_key("data_available").status, ItemStatus::Ok);
        assert_eq!(by_key("seeds_fixed").status, ItemStatus::Ok);
        assert_eq!(by_key("metrics").status, ItemStatus::Ok);
        assert_eq!(by_key("comparatives").status, ItemStatus::Partial);
        assert_eq!(by_key("commands").status, ItemStatus::Partial);
    }

    #[test]
    fn test_repo_signals_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "numpy==1.24.0").unwrap();
        std::fs::write(dir.path().join("LICENSE"), "MIT").unwrap();
        std::fs::write(dir.path().join("train.py"), "seed = 1234\n").unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("README.md"), "Usage: python train.py").unwrap();

        let checklist = generate_checklist("no paper signals", Some(dir.path()));
        let by_key = |key: &str| checklist.items.iter().find(|i| i.key == key).unwrap();

        assert_eq!(by_key("environment").status, ItemStatus::Ok);
        assert_eq!(by_key("license").status, ItemStatus::Ok);
        assert_eq!(by_key("seeds_fixed").status, ItemStatus::Ok);
        assert_eq!(by_key("data_available").status, ItemStatus::Ok);
        assert_eq!(by_key("commands").status, ItemStatus::Ok);
    }

    #[test]
    fn test_critical_missing_count() {
        let checklist = generate_checklist("nothing", None);
        assert_eq!(checklist.critical_missing(), 4);
        assert_eq!(checklist.pct_ok(), 0.0);
    }

    #[test]
    fn test_license_partial_from_readme() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "Released under the MIT license.").unwrap();
        let checklist = generate_checklist("", Some(dir.path()));
        let license = checklist.items.iter().find(|i| i.key == "license").unwrap();
        assert_eq!(license.status, ItemStatus::Partial);
    }
}
