//! In-process metrics aggregation
//!
//! Backs `GET /metrics`: per-step counts and average latencies, review
//! totals with error rate, claims-per-review, citation coverage and
//! checklist pass-rate averages. The registry is a lazily initialized
//! process-wide store; initialization and updates are safe under
//! concurrent access.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Default, Clone)]
struct Accumulator {
    count: u64,
    total: f64,
    errors: u64,
}

#[derive(Debug, Default)]
struct Registry {
    steps: HashMap<String, Accumulator>,
    reviews_total: Accumulator,
    claims_total: u64,
    citation_coverage: Accumulator,
    checklist_pass_rate: Accumulator,
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Registry::default()))
}

/// Metrics for a single processed review
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewMetrics {
    pub review_id: String,
    pub num_claims: usize,
    pub citation_coverage: f64,
    pub checklist_pass_rate: f64,
    pub total_time_seconds: f64,
    pub had_errors: bool,
}

/// Record the duration of a named processing step.
pub fn record_step_time(step: &str, duration_seconds: f64, failed: bool) {
    let mut reg = registry().lock().expect("metrics registry poisoned");
    let acc = reg.steps.entry(step.to_string()).or_default();
    acc.count += 1;
    acc.total += duration_seconds;
    if failed {
        acc.errors += 1;
    }
}

/// Record aggregate metrics for a completed review.
pub fn record_review(metrics: &ReviewMetrics) {
    let mut reg = registry().lock().expect("metrics registry poisoned");
    reg.reviews_total.count += 1;
    reg.reviews_total.total += metrics.total_time_seconds;
    if metrics.had_errors {
        reg.reviews_total.errors += 1;
    }
    reg.claims_total += metrics.num_claims as u64;
    reg.citation_coverage.count += 1;
    reg.citation_coverage.total += metrics.citation_coverage;
    reg.checklist_pass_rate.count += 1;
    reg.checklist_pass_rate.total += metrics.checklist_pass_rate;
}

/// Aggregated metrics summary for the `/metrics` endpoint.
pub fn summary() -> serde_json::Value {
    let reg = registry().lock().expect("metrics registry poisoned");
    let mut out = serde_json::Map::new();

    if reg.reviews_total.count > 0 {
        out.insert(
            "reviews".into(),
            serde_json::json!({
                "total": reg.reviews_total.count,
                "avg_time_seconds": reg.reviews_total.total / reg.reviews_total.count as f64,
                "error_rate": reg.reviews_total.errors as f64 / reg.reviews_total.count as f64,
            }),
        );
        out.insert(
            "claims".into(),
            serde_json::json!({
                "avg_per_review": reg.claims_total as f64 / reg.reviews_total.count as f64,
            }),
        );
    }

    if reg.citation_coverage.count > 0 {
        out.insert(
            "citation_coverage".into(),
            serde_json::json!({
                "avg": reg.citation_coverage.total / reg.citation_coverage.count as f64,
            }),
        );
    }

    if reg.checklist_pass_rate.count > 0 {
        out.insert(
            "checklist_pass_rate".into(),
            serde_json::json!({
                "avg": reg.checklist_pass_rate.total / reg.checklist_pass_rate.count as f64,
            }),
        );
    }

    if !reg.steps.is_empty() {
        let mut steps = serde_json::Map::new();
        for (name, acc) in &reg.steps {
            if acc.count == 0 {
                continue;
            }
            steps.insert(
                name.clone(),
                serde_json::json!({
                    "count": acc.count,
                    "avg_time_seconds": acc.total / acc.count as f64,
                    "errors": acc.errors,
                }),
            );
        }
        out.insert("steps".into(), serde_json::Value::Object(steps));
    }

    serde_json::Value::Object(out)
}

/// Reset all metrics (for testing).
pub fn reset_metrics() {
    let mut reg = registry().lock().expect("metrics registry poisoned");
    *reg = Registry::default();
}

#[cfg(test)]
mod tests {
    use super::*;

    // The registry is process-global and tests run in parallel, so each test
    // keeps to step/section names no other test touches.

    #[test]
    fn test_step_averages() {
        record_step_time("metrics_test_step", 1.0, false);
        record_step_time("metrics_test_step", 3.0, false);

        let summary = summary();
        let step = &summary["steps"]["metrics_test_step"];
        assert_eq!(step["count"], 2);
        assert!((step["avg_time_seconds"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_review_aggregates() {
        record_review(&ReviewMetrics {
            review_id: "r1".into(),
            num_claims: 4,
            citation_coverage: 0.5,
            checklist_pass_rate: 0.25,
            total_time_seconds: 2.0,
            had_errors: false,
        });
        record_review(&ReviewMetrics {
            review_id: "r2".into(),
            num_claims: 2,
            citation_coverage: 1.0,
            checklist_pass_rate: 0.75,
            total_time_seconds: 4.0,
            had_errors: true,
        });

        let summary = summary();
        assert_eq!(summary["reviews"]["total"], 2);
        assert!((summary["reviews"]["error_rate"].as_f64().unwrap() - 0.5).abs() < 1e-9);
        assert!((summary["claims"]["avg_per_review"].as_f64().unwrap() - 3.0).abs() < 1e-9);
        assert!((summary["citation_coverage"]["avg"].as_f64().unwrap() - 0.75).abs() < 1e-9);
    }
}
