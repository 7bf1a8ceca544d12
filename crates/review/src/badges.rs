//! Badge computation and rendering
//!
//! Three indicators derived from the review state: claim_mapped (>= 5
//! claims), method_check (ok / partial / fail from the checklist), and
//! citations_augmented (>= 70% of claims have a citation). SVGs are
//! rendered on demand in the shields.io style with a fixed color map.

use crate::checklist::{Checklist, ItemStatus};
use serde::{Deserialize, Serialize};

/// Valid badge types on the HTTP surface
pub const BADGE_TYPES: [&str; 3] = ["claim-mapped", "method-check", "citations-augmented"];

/// Method-check tri-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodCheck {
    Ok,
    Partial,
    Fail,
}

/// Computed badge statuses stored on the review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeStatuses {
    pub claim_mapped: bool,
    pub method_check: MethodCheck,
    pub citations_augmented: bool,
}

/// Compute all three badge statuses.
pub fn compute_badges(
    num_claims: usize,
    checklist: Option<&Checklist>,
    citation_coverage: f64,
) -> BadgeStatuses {
    let claim_mapped = num_claims >= 5;

    let method_check = match checklist {
        None => MethodCheck::Fail,
        Some(checklist) if checklist.items.is_empty() => MethodCheck::Fail,
        Some(checklist) => {
            let total = checklist.items.len();
            let ok = checklist.items.iter().filter(|i| i.status == ItemStatus::Ok).count();
            let partial =
                checklist.items.iter().filter(|i| i.status == ItemStatus::Partial).count();
            if ok == total {
                MethodCheck::Ok
            } else if (ok + partial) as f64 >= total as f64 * 0.7 {
                MethodCheck::Partial
            } else {
                MethodCheck::Fail
            }
        }
    };

    let citations_augmented = num_claims > 0 && citation_coverage >= 0.7;

    BadgeStatuses { claim_mapped, method_check, citations_augmented }
}

/// Render a badge SVG for a badge type from the stored statuses.
pub fn generate_badge_svg(badge_type: &str, statuses: &BadgeStatuses) -> String {
    let (color, text) = match badge_type {
        "claim-mapped" => {
            if statuses.claim_mapped {
                ("#10B981", "Claim-mapped".to_string())
            } else {
                ("#9CA3AF", "Not mapped".to_string())
            }
        }
        "method-check" => match statuses.method_check {
            MethodCheck::Ok => ("#10B981", "Method-check: OK".to_string()),
            MethodCheck::Partial => ("#F59E0B", "Method-check: Partial".to_string()),
            MethodCheck::Fail => ("#EF4444", "Method-check: Fail".to_string()),
        },
        "citations-augmented" => {
            if statuses.citations_augmented {
                ("#10B981", "Citations-augmented".to_string())
            } else {
                ("#9CA3AF", "No citations".to_string())
            }
        }
        _ => ("#9CA3AF", "Unknown".to_string()),
    };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="150" height="20" role="img" aria-label="{text}">
  <title>{text}</title>
  <linearGradient id="s" x2="0" y2="100%">
    <stop offset="0" stop-color="#bbb" stop-opacity=".1"/>
    <stop offset="1" stop-opacity=".1"/>
  </linearGradient>
  <clipPath id="r">
    <rect width="150" height="20" rx="3" fill="#fff"/>
  </clipPath>
  <g clip-path="url(#r)">
    <rect width="150" height="20" fill="#555"/>
    <rect x="0" width="150" height="20" fill="{color}"/>
    <rect width="150" height="20" fill="url(#s)"/>
  </g>
  <g fill="#fff" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" text-rendering="geometricPrecision" font-size="11">
    <text x="75" y="14" fill="#010101" fill-opacity=".3">{text}</text>
    <text x="75" y="13">{text}</text>
  </g>
</svg>"##
    )
}

/// Markdown embed snippet for a badge
pub fn badge_snippet(badge_type: &str, review_id: &str, base_url: &str) -> String {
    let badge_url = format!("{base_url}/badges/{review_id}/{badge_type}.svg");
    let review_url = format!("{base_url}/reviews/{review_id}");
    format!("[![Arandu: {badge_type}]({badge_url})]({review_url})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{ChecklistItem, EvidenceSource};

    fn checklist_with(ok: usize, partial: usize, missing: usize) -> Checklist {
        let mut items = Vec::new();
        for (count, status) in
            [(ok, ItemStatus::Ok), (partial, ItemStatus::Partial), (missing, ItemStatus::Missing)]
        {
            for i in 0..count {
                items.push(ChecklistItem {
                    key: format!("item_{status:?}_{i}"),
                    status,
                    evidence: None,
                    source: EvidenceSource::Paper,
                });
            }
        }
        Checklist { items, summary: String::new() }
    }

    #[test]
    fn test_claim_mapped_threshold() {
        assert!(!compute_badges(4, None, 0.0).claim_mapped);
        assert!(compute_badges(5, None, 0.0).claim_mapped);
    }

    #[test]
    fn test_method_check_all_ok() {
        let checklist = checklist_with(7, 0, 0);
        assert_eq!(compute_badges(0, Some(&checklist), 0.0).method_check, MethodCheck::Ok);
    }

    #[test]
    fn test_method_check_partial_at_70_percent() {
        // 5 of 7 ok-or-partial: 71% -> partial.
        let checklist = checklist_with(3, 2, 2);
        assert_eq!(compute_badges(0, Some(&checklist), 0.0).method_check, MethodCheck::Partial);

        // 4 of 7: 57% -> fail.
        let checklist = checklist_with(2, 2, 3);
        assert_eq!(compute_badges(0, Some(&checklist), 0.0).method_check, MethodCheck::Fail);
    }

    #[test]
    fn test_method_check_without_checklist_fails() {
        assert_eq!(compute_badges(0, None, 0.0).method_check, MethodCheck::Fail);
        let empty = Checklist { items: vec![], summary: String::new() };
        assert_eq!(compute_badges(0, Some(&empty), 0.0).method_check, MethodCheck::Fail);
    }

    #[test]
    fn test_citations_augmented_coverage() {
        assert!(compute_badges(10, None, 0.7).citations_augmented);
        assert!(!compute_badges(10, None, 0.69).citations_augmented);
        // No claims means no augmentation regardless of coverage.
        assert!(!compute_badges(0, None, 1.0).citations_augmented);
    }

    #[test]
    fn test_svg_reflects_status() {
        let statuses = BadgeStatuses {
            claim_mapped: true,
            method_check: MethodCheck::Partial,
            citations_augmented: false,
        };

        let svg = generate_badge_svg("claim-mapped", &statuses);
        assert!(svg.contains("#10B981"));
        assert!(svg.contains("Claim-mapped"));

        let svg = generate_badge_svg("method-check", &statuses);
        assert!(svg.contains("#F59E0B"));
        assert!(svg.contains("Method-check: Partial"));

        let svg = generate_badge_svg("citations-augmented", &statuses);
        assert!(svg.contains("#9CA3AF"));
        assert!(svg.contains("No citations"));
    }

    #[test]
    fn test_badge_snippet() {
        let snippet = badge_snippet("method-check", "r1", "http://localhost:8000");
        assert!(snippet.contains("http://localhost:8000/badges/r1/method-check.svg"));
        assert!(snippet.contains("http://localhost:8000/reviews/r1"));
    }

    #[test]
    fn test_statuses_serialize_lowercase() {
        let statuses = BadgeStatuses {
            claim_mapped: true,
            method_check: MethodCheck::Ok,
            citations_augmented: false,
        };
        let json = serde_json::to_value(&statuses).unwrap();
        assert_eq!(json["method_check"], "ok");
        assert_eq!(json["claim_mapped"], true);
    }
}
