//! Quality score prediction
//!
//! Loads a serialised linear model from disk lazily at first use; when the
//! model is absent or unreadable the deterministic baseline heuristic is
//! used. Tiers: A >= 85 > B >= 70 > C >= 55 > D.

use crate::quality::features::QualityFeatures;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Version stamp carried on every prediction
pub const MODEL_VERSION: &str = "v0.1.0";

/// Model file location under the artifacts base
pub const MODEL_FILE: &str = "models/quality_score_v01.json";

/// A serialised linear scoring model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub version: String,
    pub bias: f64,
    pub weights: std::collections::HashMap<String, f64>,
}

impl LinearModel {
    fn predict(&self, features: &QualityFeatures) -> f64 {
        let mut score = self.bias;
        for (name, weight) in &self.weights {
            score += weight * features.value(name);
        }
        score.clamp(0.0, 100.0)
    }
}

/// Prediction output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorePrediction {
    pub score: f64,
    pub tier: String,
    pub version: String,
    pub model_type: String,
}

fn model_cache() -> &'static OnceLock<Option<LinearModel>> {
    static MODEL: OnceLock<Option<LinearModel>> = OnceLock::new();
    &MODEL
}

fn load_model(artifacts_base: &Path) -> &'static Option<LinearModel> {
    model_cache().get_or_init(|| {
        let path: PathBuf = artifacts_base.join(MODEL_FILE);
        if !path.exists() {
            warn!(path = %path.display(), "Model not found, using baseline heuristic");
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<LinearModel>(&content) {
                Ok(model) => {
                    info!(path = %path.display(), version = %model.version, "Loaded quality score model");
                    Some(model)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse model, using baseline heuristic");
                    None
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read model, using baseline heuristic");
                None
            }
        }
    })
}

/// Baseline heuristic prediction in [0, 100].
pub fn predict_baseline(features: &QualityFeatures) -> f64 {
    let mut score = 50.0;

    // Paper signals
    if features.has_ablation {
        score += 10.0;
    }
    if features.has_baselines {
        score += 10.0;
    }
    if features.has_error_bars {
        score += 5.0;
    }
    if features.has_seeds {
        score += 5.0;
    }

    // Repo signals
    if features.has_requirements {
        score += 5.0;
    }
    if features.has_lock_file {
        score += 5.0;
    }
    if features.has_ci {
        score += 5.0;
    }
    if features.has_tests {
        score += 5.0;
    }
    if features.has_repro_readme {
        score += 5.0;
    }
    if features.has_license {
        score += 5.0;
    }

    // Citations and checklist
    score += features.citation_coverage * 10.0;
    score += features.checklist_pct_ok * 10.0;

    // Penalty
    score -= features.critical_items_missing as f64 * 5.0;

    score.clamp(0.0, 100.0)
}

/// Tier label for a score
pub fn tier_for(score: f64) -> &'static str {
    if score >= 85.0 {
        "A"
    } else if score >= 70.0 {
        "B"
    } else if score >= 55.0 {
        "C"
    } else {
        "D"
    }
}

/// Predict the quality score, preferring the trained model.
pub fn predict_quality_score(features: &QualityFeatures, artifacts_base: &Path) -> ScorePrediction {
    let model = load_model(artifacts_base);

    let (score, model_type) = match model {
        Some(model) => (model.predict(features), "ml"),
        None => (predict_baseline(features), "baseline"),
    };

    let score = (score * 10.0).round() / 10.0;

    ScorePrediction {
        score,
        tier: tier_for(score).to_string(),
        version: MODEL_VERSION.to_string(),
        model_type: model_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_empty_features() {
        let features = QualityFeatures::default();
        // Base 50 minus nothing: no checklist means no critical count here.
        assert_eq!(predict_baseline(&features), 50.0);
    }

    #[test]
    fn test_baseline_increments() {
        let features = QualityFeatures {
            has_ablation: true,
            has_baselines: true,
            has_error_bars: true,
            has_seeds: true,
            ..Default::default()
        };
        assert_eq!(predict_baseline(&features), 80.0);
    }

    #[test]
    fn test_baseline_penalty_and_clamp() {
        let features = QualityFeatures { critical_items_missing: 4, ..Default::default() };
        assert_eq!(predict_baseline(&features), 30.0);

        let features = QualityFeatures { critical_items_missing: 20, ..Default::default() };
        assert_eq!(predict_baseline(&features), 0.0);
    }

    #[test]
    fn test_baseline_coverage_contributions() {
        let features = QualityFeatures {
            citation_coverage: 1.0,
            checklist_pct_ok: 0.5,
            ..Default::default()
        };
        assert_eq!(predict_baseline(&features), 65.0);
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(tier_for(85.0), "A");
        assert_eq!(tier_for(84.9), "B");
        assert_eq!(tier_for(70.0), "B");
        assert_eq!(tier_for(69.9), "C");
        assert_eq!(tier_for(55.0), "C");
        assert_eq!(tier_for(54.9), "D");
        assert_eq!(tier_for(0.0), "D");
    }

    #[test]
    fn test_prediction_without_model_is_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let prediction = predict_quality_score(&QualityFeatures::default(), dir.path());
        assert_eq!(prediction.model_type, "baseline");
        assert_eq!(prediction.score, 50.0);
        assert_eq!(prediction.tier, "D");
        assert_eq!(prediction.version, MODEL_VERSION);
    }

    #[test]
    fn test_linear_model_predict() {
        let mut weights = std::collections::HashMap::new();
        weights.insert("has_tests".to_string(), 20.0);
        weights.insert("critical_items_missing".to_string(), -10.0);
        let model = LinearModel { version: "test".into(), bias: 40.0, weights };

        let features = QualityFeatures {
            has_tests: true,
            critical_items_missing: 1,
            ..Default::default()
        };
        assert_eq!(model.predict(&features), 50.0);
    }
}
