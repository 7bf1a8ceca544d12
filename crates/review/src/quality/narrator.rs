//! Narrative generation for the quality score
//!
//! An LLM attempt comes first (strict JSON shape); on any failure the
//! deterministic heuristic narrator produces the executive bullets and the
//! technical deep-dive.

use crate::checklist::{Checklist, ItemStatus};
use crate::claims::Claim;
use crate::ingestion::PaperMeta;
use crate::llm::GeminiClient;
use crate::quality::shap::ShapAttribution;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Generated narrative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    pub executive_justification: Vec<String>,
    pub technical_deepdive: String,
}

/// Generate the narrative, preferring the LLM when available.
pub async fn generate_narrative(
    score: f64,
    tier: &str,
    shap: &[ShapAttribution],
    checklist: Option<&Checklist>,
    claims: &[Claim],
    paper_meta: Option<&PaperMeta>,
    llm: Option<&GeminiClient>,
) -> Narrative {
    if let Some(llm) = llm {
        let prompt = build_llm_prompt(score, tier, shap, checklist, paper_meta);
        if let Some(parsed) = llm.generate_structured(&prompt).await {
            if let Ok(narrative) = serde_json::from_value::<Narrative>(parsed) {
                if !narrative.executive_justification.is_empty() {
                    info!("Narrative generated by LLM");
                    return narrative;
                }
            }
        }
        info!("LLM narrative unavailable, using heuristic narrator");
    }

    heuristic_narrative(score, tier, shap, checklist, claims)
}

fn build_llm_prompt(
    score: f64,
    tier: &str,
    shap: &[ShapAttribution],
    checklist: Option<&Checklist>,
    paper_meta: Option<&PaperMeta>,
) -> String {
    let title = paper_meta
        .and_then(|m| m.title.as_deref())
        .unwrap_or("the paper");
    let shap_summary: Vec<String> = shap
        .iter()
        .take(5)
        .map(|s| format!("{}={:+.1}", s.feature, s.phi))
        .collect();
    let checklist_summary = checklist.map(|c| c.summary.clone()).unwrap_or_default();

    format!(
        "You are assessing the reproducibility of {title}. The quality score is {score:.1}/100 \
         (tier {tier}). Top factor contributions: {}. {checklist_summary}\n\
         Respond with strict JSON: {{\"executive_justification\": [3-5 bullet strings], \
         \"technical_deepdive\": \"one paragraph\"}}. No markdown, JSON only.",
        shap_summary.join(", ")
    )
}

/// Deterministic fallback narrator.
pub fn heuristic_narrative(
    score: f64,
    tier: &str,
    shap: &[ShapAttribution],
    checklist: Option<&Checklist>,
    claims: &[Claim],
) -> Narrative {
    let mut bullets = Vec::new();

    bullets.push(match tier {
        "A" => format!(
            "Score {score:.1}/100 (Tier {tier}): Excellent evidence quality and reproducibility practices."
        ),
        "B" => format!(
            "Score {score:.1}/100 (Tier {tier}): Good evidence quality with minor gaps in reproducibility."
        ),
        "C" => format!(
            "Score {score:.1}/100 (Tier {tier}): Moderate evidence quality; several reproducibility items need attention."
        ),
        _ => format!(
            "Score {score:.1}/100 (Tier {tier}): Evidence quality needs significant improvement for reproducibility."
        ),
    });

    let mut positives: Vec<&ShapAttribution> = shap.iter().filter(|s| s.phi > 0.0).collect();
    positives.sort_by(|a, b| b.phi.partial_cmp(&a.phi).unwrap_or(std::cmp::Ordering::Equal));
    if let Some(top) = positives.first() {
        bullets.push(format!(
            "Strongest positive factor: {} (contributes +{:.1} points).",
            format_feature_name(&top.feature),
            top.phi
        ));
    }

    let mut negatives: Vec<&ShapAttribution> = shap.iter().filter(|s| s.phi < 0.0).collect();
    negatives.sort_by(|a, b| {
        b.phi.abs().partial_cmp(&a.phi.abs()).unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(top) = negatives.first() {
        bullets.push(format!(
            "Main area for improvement: {} (reduces score by {:.1} points).",
            format_feature_name(&top.feature),
            top.phi.abs()
        ));
    }

    if let Some(checklist) = checklist {
        let missing_critical: Vec<&str> = checklist
            .items
            .iter()
            .filter(|i| {
                i.status == ItemStatus::Missing
                    && matches!(i.key.as_str(), "data_available" | "seeds_fixed" | "environment")
            })
            .map(|i| i.key.as_str())
            .take(3)
            .collect();
        if !missing_critical.is_empty() {
            bullets.push(format!(
                "Critical reproducibility items missing: {}.",
                missing_critical.join(", ")
            ));
        }
    }

    if matches!(tier, "C" | "D") {
        bullets.push(
            "Recommendations: Add missing reproducibility artifacts (data links, seeds, \
             environment files) and improve evidence quality (ablation studies, baselines, \
             error bars)."
                .to_string(),
        );
    }

    bullets.truncate(5);

    Narrative {
        executive_justification: bullets,
        technical_deepdive: technical_deepdive(score, shap, checklist, claims),
    }
}

fn technical_deepdive(
    score: f64,
    shap: &[ShapAttribution],
    checklist: Option<&Checklist>,
    claims: &[Claim],
) -> String {
    let mut lines = vec![format!("Technical Analysis (Score: {score:.1}/100)")];

    lines.push("\nTop Feature Contributions:".to_string());
    for (i, attribution) in shap.iter().take(5).enumerate() {
        lines.push(format!(
            "  {}. {}: {:+.1} (value: {})",
            i + 1,
            format_feature_name(&attribution.feature),
            attribution.phi,
            attribution.value
        ));
    }

    if let Some(checklist) = checklist {
        lines.push("\nChecklist Status:".to_string());
        for item in &checklist.items {
            let status = match item.status {
                ItemStatus::Ok => "ok",
                ItemStatus::Partial => "partial",
                ItemStatus::Missing => "missing",
            };
            lines.push(format!("  - {}: {status}", format_feature_name(&item.key)));
        }
    }

    if !claims.is_empty() {
        lines.push(format!("\nClaims Extracted: {}", claims.len()));
        let mut sections: HashMap<String, usize> = HashMap::new();
        for claim in claims {
            let section = claim.section.clone().unwrap_or_else(|| "unknown".to_string());
            *sections.entry(section).or_insert(0) += 1;
        }
        let mut parts: Vec<String> =
            sections.into_iter().map(|(k, v)| format!("{k}: {v}")).collect();
        parts.sort();
        lines.push(format!("  By section: {}", parts.join(", ")));
    }

    lines.join("\n")
}

/// Human-readable feature labels
fn format_feature_name(feature: &str) -> String {
    match feature {
        "has_ablation" => "Ablation studies".to_string(),
        "has_baselines" => "Baseline comparisons".to_string(),
        "has_error_bars" => "Error bars / confidence intervals".to_string(),
        "has_seeds" => "Random seed control".to_string(),
        "has_requirements" => "Dependency files".to_string(),
        "has_lock_file" => "Lock files".to_string(),
        "has_ci" => "CI/CD configuration".to_string(),
        "has_tests" => "Test suite".to_string(),
        "has_repro_readme" => "Reproducibility instructions".to_string(),
        "has_license" => "License file".to_string(),
        "citation_coverage" => "Citation coverage".to_string(),
        "checklist_pct_ok" => "Checklist completion".to_string(),
        "critical_items_missing" => "Critical items missing".to_string(),
        "data_available" => "Data availability".to_string(),
        "seeds_fixed" => "Seed fixation".to_string(),
        "environment" => "Environment files".to_string(),
        "commands" => "Execution commands".to_string(),
        "metrics" => "Metrics definition".to_string(),
        "comparatives" => "Baseline comparisons".to_string(),
        "license" => "License".to_string(),
        other => {
            let spaced = other.replace('_', " ");
            let mut chars = spaced.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => spaced,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::generate_checklist;

    fn shap_fixture() -> Vec<ShapAttribution> {
        vec![
            ShapAttribution {
                feature: "has_ablation".into(),
                value: 1.0,
                phi: 10.0,
                evidence_anchor: None,
            },
            ShapAttribution {
                feature: "critical_items_missing".into(),
                value: 2.0,
                phi: -10.0,
                evidence_anchor: None,
            },
        ]
    }

    #[tokio::test]
    async fn test_fallback_without_llm() {
        let narrative =
            generate_narrative(62.0, "C", &shap_fixture(), None, &[], None, None).await;
        assert!(!narrative.executive_justification.is_empty());
        assert!(narrative.executive_justification[0].contains("62.0/100"));
    }

    #[test]
    fn test_bullets_mention_top_factors() {
        let narrative = heuristic_narrative(62.0, "C", &shap_fixture(), None, &[]);
        let text = narrative.executive_justification.join(" | ");
        assert!(text.contains("Ablation studies"));
        assert!(text.contains("Critical items missing"));
        // Tier C gets the recommendation block.
        assert!(text.contains("Recommendations:"));
    }

    #[test]
    fn test_tier_a_has_no_recommendations() {
        let narrative = heuristic_narrative(90.0, "A", &shap_fixture(), None, &[]);
        let text = narrative.executive_justification.join(" | ");
        assert!(!text.contains("Recommendations:"));
        assert!(text.contains("Excellent"));
    }

    #[test]
    fn test_bullet_count_bounds() {
        let checklist = generate_checklist("nothing here", None);
        let narrative = heuristic_narrative(30.0, "D", &shap_fixture(), Some(&checklist), &[]);
        let n = narrative.executive_justification.len();
        assert!((3..=5).contains(&n), "expected 3-5 bullets, got {n}");
    }

    #[test]
    fn test_deepdive_lists_checklist_statuses() {
        let checklist = generate_checklist("accuracy and baselines", None);
        let narrative = heuristic_narrative(50.0, "D", &shap_fixture(), Some(&checklist), &[]);
        assert!(narrative.technical_deepdive.contains("Checklist Status:"));
        assert!(narrative.technical_deepdive.contains("Metrics definition: ok"));
    }

    #[test]
    fn test_missing_critical_items_bullet() {
        let checklist = generate_checklist("no signals at all", None);
        let narrative = heuristic_narrative(30.0, "D", &[], Some(&checklist), &[]);
        let text = narrative.executive_justification.join(" | ");
        assert!(text.contains("Critical reproducibility items missing"));
    }
}
