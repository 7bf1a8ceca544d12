//! Quality scoring
//!
//! Feature assembly, score prediction (model or baseline heuristic),
//! SHAP-style attributions, and narrative generation.

pub mod features;
pub mod narrator;
pub mod predictor;
pub mod shap;

pub use features::{build_features, QualityFeatures};
pub use narrator::Narrative;
pub use predictor::{predict_quality_score, ScorePrediction};
pub use shap::ShapAttribution;

use serde::{Deserialize, Serialize};

/// The complete quality-score slot stored on a review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityScoreResult {
    pub value_0_100: f64,
    pub tier: String,
    pub version: String,
    pub model_type: String,
    pub features: serde_json::Value,
    pub shap: Vec<ShapAttribution>,
    pub narrative: Narrative,
}
