//! Feature assembly for the quality score
//!
//! Flattens paper signals, repo signals, aggregated citation signals, and
//! checklist signals into one numeric feature vector.

use crate::checklist::Checklist;
use crate::citations::CitationCandidate;
use crate::claims::Claim;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Features for quality score prediction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityFeatures {
    // Paper
    pub num_claims: usize,
    pub claims_per_section: HashMap<String, f64>,
    pub has_ablation: bool,
    pub has_baselines: bool,
    pub has_error_bars: bool,
    pub has_seeds: bool,

    // Repo
    pub has_requirements: bool,
    pub has_lock_file: bool,
    pub versions_pinned: f64,
    pub has_ci: bool,
    pub has_tests: bool,
    pub has_repro_readme: bool,
    pub has_license: bool,

    // Citations
    pub citation_coverage: f64,
    pub avg_citation_relevance: f64,

    // Checklist
    pub checklist_pct_ok: f64,
    pub critical_items_missing: usize,
}

impl QualityFeatures {
    /// Numeric value of a named scalar feature (booleans map to 0/1).
    /// Used by the predictor and explainer; the claims-per-section map is
    /// not part of the flat vector.
    pub fn value(&self, name: &str) -> f64 {
        match name {
            "num_claims" => self.num_claims as f64,
            "has_ablation" => self.has_ablation as u8 as f64,
            "has_baselines" => self.has_baselines as u8 as f64,
            "has_error_bars" => self.has_error_bars as u8 as f64,
            "has_seeds" => self.has_seeds as u8 as f64,
            "has_requirements" => self.has_requirements as u8 as f64,
            "has_lock_file" => self.has_lock_file as u8 as f64,
            "versions_pinned" => self.versions_pinned,
            "has_ci" => self.has_ci as u8 as f64,
            "has_tests" => self.has_tests as u8 as f64,
            "has_repro_readme" => self.has_repro_readme as u8 as f64,
            "has_license" => self.has_license as u8 as f64,
            "citation_coverage" => self.citation_coverage,
            "avg_citation_relevance" => self.avg_citation_relevance,
            "checklist_pct_ok" => self.checklist_pct_ok,
            "critical_items_missing" => self.critical_items_missing as f64,
            _ => 0.0,
        }
    }

    /// The flat feature names in a stable order
    pub fn scalar_names() -> &'static [&'static str] {
        &[
            "num_claims",
            "has_ablation",
            "has_baselines",
            "has_error_bars",
            "has_seeds",
            "has_requirements",
            "has_lock_file",
            "versions_pinned",
            "has_ci",
            "has_tests",
            "has_repro_readme",
            "has_license",
            "citation_coverage",
            "avg_citation_relevance",
            "checklist_pct_ok",
            "critical_items_missing",
        ]
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static feature regex")
}

fn extract_paper_features(features: &mut QualityFeatures, claims: &[Claim], paper_text: &str) {
    features.num_claims = claims.len();

    let mut per_section: HashMap<String, usize> = HashMap::new();
    for claim in claims {
        let section = claim.section.clone().unwrap_or_else(|| "unknown".to_string());
        *per_section.entry(section).or_insert(0) += 1;
    }
    let total = claims.len().max(1) as f64;
    features.claims_per_section =
        per_section.into_iter().map(|(k, v)| (k, v as f64 / total)).collect();

    features.has_ablation = re(r"(?i)ablation|ablative").is_match(paper_text);
    features.has_baselines = re(r"(?i)baseline|comparison|compared\s+to").is_match(paper_text);
    features.has_error_bars =
        re(r"(?i)error\s+bar|confidence\s+interval|std|standard\s+deviation").is_match(paper_text);
    features.has_seeds = re(r"(?i)seed|random[_\s]?state").is_match(paper_text);
}

fn extract_repo_features(features: &mut QualityFeatures, repo_path: Option<&Path>) {
    let Some(repo) = repo_path else { return };
    if !repo.exists() {
        return;
    }

    for req_file in ["requirements.txt", "pyproject.toml", "environment.yml", "Pipfile"] {
        if repo.join(req_file).exists() {
            features.has_requirements = true;
            break;
        }
    }

    for lock_file in ["poetry.lock", "Pipfile.lock", "package-lock.json"] {
        if repo.join(lock_file).exists() {
            features.has_lock_file = true;
            break;
        }
    }

    if let Ok(content) = std::fs::read_to_string(repo.join("requirements.txt")) {
        let pinned = content.lines().filter(|l| l.contains("==") || l.contains('@')).count();
        let total = content.lines().filter(|l| !l.trim().is_empty()).count().max(1);
        features.versions_pinned = (pinned as f64 / total as f64).min(1.0);
    }

    for ci_path in [".github/workflows", ".gitlab-ci.yml", ".travis.yml", "circleci"] {
        if repo.join(ci_path).exists() {
            features.has_ci = true;
            break;
        }
    }

    features.has_tests = walkdir::WalkDir::new(repo)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| {
            e.file_type().is_file()
                && e.file_name().to_string_lossy().starts_with("test_")
                && e.path().extension().map(|x| x == "py").unwrap_or(false)
        });

    if let Ok(readme) = std::fs::read_to_string(repo.join("README.md")) {
        features.has_repro_readme =
            re(r"(?i)reproduce|reproducibility|how\s+to\s+run").is_match(&readme);
    }

    for license_file in ["LICENSE", "LICENSE.txt", "LICENSE.md"] {
        if repo.join(license_file).exists() {
            features.has_license = true;
            break;
        }
    }
}

fn extract_citation_features(
    features: &mut QualityFeatures,
    citations: &HashMap<String, Vec<CitationCandidate>>,
    claims: &[Claim],
) {
    if claims.is_empty() {
        return;
    }

    let covered = claims
        .iter()
        .filter(|c| citations.get(&c.id).map(|v| !v.is_empty()).unwrap_or(false))
        .count();
    features.citation_coverage = covered as f64 / claims.len() as f64;

    let scores: Vec<f64> = citations
        .values()
        .flatten()
        .map(|c| {
            if c.score_final != 0.0 { c.score_final as f64 } else { c.score_rerank as f64 }
        })
        .collect();
    if !scores.is_empty() {
        features.avg_citation_relevance = scores.iter().sum::<f64>() / scores.len() as f64;
    }
}

fn extract_checklist_features(features: &mut QualityFeatures, checklist: &Checklist) {
    features.checklist_pct_ok = checklist.pct_ok();
    features.critical_items_missing = checklist.critical_missing();
}

/// Build the complete feature set.
pub fn build_features(
    claims: &[Claim],
    paper_text: &str,
    checklist: &Checklist,
    citations: Option<&HashMap<String, Vec<CitationCandidate>>>,
    repo_path: Option<&Path>,
) -> QualityFeatures {
    let mut features = QualityFeatures::default();
    extract_paper_features(&mut features, claims, paper_text);
    extract_repo_features(&mut features, repo_path);
    if let Some(citations) = citations {
        extract_citation_features(&mut features, citations, claims);
    }
    extract_checklist_features(&mut features, checklist);
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::generate_checklist;

    fn claim(id: &str, section: Option<&str>) -> Claim {
        Claim {
            id: id.to_string(),
            text: "We show something measurable here.".to_string(),
            section: section.map(|s| s.to_string()),
            spans: vec![],
            confidence: 0.7,
        }
    }

    #[test]
    fn test_paper_signals() {
        let text = "We run an ablation study with seed 42, report standard deviation bars, \
                    and compare against a strong baseline.";
        let checklist = generate_checklist(text, None);
        let features = build_features(&[claim("c0", Some("results"))], text, &checklist, None, None);

        assert!(features.has_ablation);
        assert!(features.has_baselines);
        assert!(features.has_error_bars);
        assert!(features.has_seeds);
        assert_eq!(features.num_claims, 1);
        assert_eq!(features.claims_per_section.get("results"), Some(&1.0));
    }

    #[test]
    fn test_repo_signals() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "numpy==1.24.0\npandas\n").unwrap();
        std::fs::write(dir.path().join("poetry.lock"), "").unwrap();
        std::fs::create_dir_all(dir.path().join(".github/workflows")).unwrap();
        std::fs::write(dir.path().join("test_model.py"), "def test(): pass").unwrap();
        std::fs::write(dir.path().join("README.md"), "How to run: python main.py").unwrap();
        std::fs::write(dir.path().join("LICENSE"), "MIT").unwrap();

        let checklist = generate_checklist("", Some(dir.path()));
        let features = build_features(&[], "", &checklist, None, Some(dir.path()));

        assert!(features.has_requirements);
        assert!(features.has_lock_file);
        assert!(features.has_ci);
        assert!(features.has_tests);
        assert!(features.has_repro_readme);
        assert!(features.has_license);
        assert!((features.versions_pinned - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_citation_coverage() {
        let claims = vec![claim("c0", None), claim("c1", None)];
        let mut citations: HashMap<String, Vec<CitationCandidate>> = HashMap::new();
        citations.insert(
            "c0".into(),
            vec![CitationCandidate {
                doc_id: "d".into(),
                title: "T".into(),
                authors: vec![],
                venue: None,
                year: None,
                doi: None,
                url: None,
                score_sparse: 0.0,
                score_dense: 0.0,
                score_final: 0.8,
                score_rerank: 1.0,
                justification: String::new(),
            }],
        );
        citations.insert("c1".into(), vec![]);

        let checklist = generate_checklist("", None);
        let features = build_features(&claims, "", &checklist, Some(&citations), None);
        assert!((features.citation_coverage - 0.5).abs() < 1e-9);
        assert!((features.avg_citation_relevance - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_scalar_values_accessible() {
        let features = QualityFeatures { has_ablation: true, versions_pinned: 0.4, ..Default::default() };
        assert_eq!(features.value("has_ablation"), 1.0);
        assert_eq!(features.value("versions_pinned"), 0.4);
        assert_eq!(features.value("unknown_feature"), 0.0);
        for name in QualityFeatures::scalar_names() {
            let _ = features.value(name);
        }
    }
}
