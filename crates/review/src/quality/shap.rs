//! SHAP-style per-feature attributions
//!
//! With a trained linear model the attribution is the model weight times the
//! feature value; without one, the static weights of the baseline heuristic
//! are used. Either way the top 10 attributions by |phi| are returned.

use crate::quality::features::QualityFeatures;
use crate::quality::predictor::LinearModel;
use serde::{Deserialize, Serialize};

/// One feature attribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapAttribution {
    pub feature: String,
    pub value: f64,
    pub phi: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_anchor: Option<String>,
}

/// Static weights mirroring the baseline predictor's increments
const HEURISTIC_WEIGHTS: [(&str, f64); 13] = [
    ("has_ablation", 10.0),
    ("has_baselines", 10.0),
    ("citation_coverage", 10.0),
    ("checklist_pct_ok", 10.0),
    ("has_requirements", 5.0),
    ("has_lock_file", 5.0),
    ("has_ci", 5.0),
    ("has_tests", 5.0),
    ("has_repro_readme", 5.0),
    ("has_license", 5.0),
    ("has_error_bars", 5.0),
    ("has_seeds", 5.0),
    ("critical_items_missing", -5.0),
];

/// Attributions from weight/value products, sorted by |phi|, top 10.
fn attribute(
    pairs: impl Iterator<Item = (String, f64)>,
    features: &QualityFeatures,
) -> Vec<ShapAttribution> {
    let mut attributions: Vec<ShapAttribution> = pairs
        .filter_map(|(feature, weight)| {
            let value = features.value(&feature);
            if weight == 0.0 || value == 0.0 {
                return None;
            }
            Some(ShapAttribution { phi: weight * value, feature, value, evidence_anchor: None })
        })
        .collect();

    attributions.sort_by(|a, b| {
        b.phi.abs().partial_cmp(&a.phi.abs()).unwrap_or(std::cmp::Ordering::Equal)
    });
    attributions.truncate(10);
    attributions
}

/// Explain a prediction.
pub fn explain(features: &QualityFeatures, model: Option<&LinearModel>) -> Vec<ShapAttribution> {
    match model {
        Some(model) => attribute(
            model.weights.iter().map(|(name, weight)| (name.clone(), *weight)),
            features,
        ),
        None => attribute(
            HEURISTIC_WEIGHTS.iter().map(|(name, weight)| (name.to_string(), *weight)),
            features,
        ),
    }
}
