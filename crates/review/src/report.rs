//! Review report builder (HTML + JSON)
//!
//! The JSON snapshot is the canonical machine-readable form; the HTML
//! report is derived from it. Both are written under
//! `<reviews_base>/<review_id>/`.

use crate::state::ReviewState;
use std::path::{Path, PathBuf};
use tracing::info;

/// Build the complete review snapshot from the pipeline state.
pub fn build_review_data(state: &ReviewState) -> serde_json::Value {
    serde_json::json!({
        "id": state.review_id,
        "url": state.url,
        "doi": state.doi,
        "repo_url": state.repo_url,
        "status": state.status.as_str(),
        "paper_meta": state.paper_meta,
        "claims": state.claims,
        "citations": state.citations,
        "checklist": state.checklist,
        "quality_score": state.quality_score,
        "badges": state.badges,
        "errors": state.errors,
        "generated_at": chrono::Utc::now().to_rfc3339(),
    })
}

/// Write the JSON report.
pub fn generate_json_report(review_data: &serde_json::Value, output_path: &Path) -> Result<PathBuf, String> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("Cannot create reports dir: {e}"))?;
    }
    let content = serde_json::to_string_pretty(review_data)
        .map_err(|e| format!("Cannot serialize review data: {e}"))?;
    std::fs::write(output_path, content).map_err(|e| format!("Cannot write JSON report: {e}"))?;
    info!(path = %output_path.display(), "Generated JSON report");
    Ok(output_path.to_path_buf())
}

/// Write the HTML report.
pub fn generate_html_report(review_data: &serde_json::Value, output_path: &Path) -> Result<PathBuf, String> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("Cannot create reports dir: {e}"))?;
    }
    let content = build_html_content(review_data);
    std::fs::write(output_path, content).map_err(|e| format!("Cannot write HTML report: {e}"))?;
    info!(path = %output_path.display(), "Generated HTML report");
    Ok(output_path.to_path_buf())
}

fn build_html_content(review_data: &serde_json::Value) -> String {
    let paper_meta = &review_data["paper_meta"];
    let title = paper_meta["title"].as_str().unwrap_or("Untitled Paper");
    let authors = paper_meta["authors"]
        .as_array()
        .map(|a| {
            a.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown authors".to_string());
    let venue = paper_meta["venue"].as_str().unwrap_or("Unknown venue");
    let published = paper_meta["published_at"].as_str().unwrap_or("Unknown date");

    let claims = review_data["claims"].as_array().cloned().unwrap_or_default();
    let citations = &review_data["citations"];
    let checklist = &review_data["checklist"];
    let quality_score = &review_data["quality_score"];
    let review_id = review_data["id"].as_str().unwrap_or("unknown");

    let ok_items = checklist["items"]
        .as_array()
        .map(|items| {
            items.iter().filter(|i| i["status"].as_str() == Some("ok")).count()
        })
        .unwrap_or(0);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Arandu Review: {title}</title>
    <style>
        :root {{
            --color-primary: #214235;
            --color-success: #10B981;
            --color-warning: #F59E0B;
            --color-error: #EF4444;
        }}
        body {{ font-family: sans-serif; background: #f9fafb; color: #111827; margin: 0; }}
        .container {{ max-width: 72rem; margin: 0 auto; padding: 2rem 1.5rem; }}
        section {{ background: #fff; border-radius: 0.5rem; padding: 1.5rem; margin-bottom: 2rem; box-shadow: 0 1px 2px rgba(0,0,0,.05); }}
        .score {{ font-size: 3.75rem; font-weight: 700; }}
        .tier-A {{ color: #059669; }} .tier-B {{ color: #2563eb; }}
        .tier-C {{ color: #d97706; }} .tier-D {{ color: #dc2626; }}
        .claim {{ border-left: 3px solid var(--color-primary); padding-left: 0.75rem; margin-bottom: 1rem; }}
        .status-ok {{ color: var(--color-success); }}
        .status-partial {{ color: var(--color-warning); }}
        .status-missing {{ color: var(--color-error); }}
        footer {{ border-top: 1px solid #e5e7eb; padding-top: 1.5rem; font-size: 0.875rem; color: #6b7280; }}
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>{title}</h1>
            <div>{authors}</div>
            <div>{venue} &bull; {published}</div>
        </header>

        <section>
            <h2>Badges</h2>
            {badges}
        </section>

        <section>
            <h2>Summary</h2>
            <p>This review analyzed <strong>{claim_count} claims</strong> extracted from the paper.
            The method checklist identified <strong>{ok_items} items as complete</strong>.</p>
        </section>

        {quality}

        <section>
            <h2>Claims &amp; Citations</h2>
            {claims_html}
        </section>

        <section>
            <h2>Checklist</h2>
            {checklist_html}
        </section>

        <footer>
            <div><strong>Review ID:</strong> {review_id}</div>
            <div><strong>DOI:</strong> {doi}</div>
            <div><strong>Pipeline Version:</strong> {version}</div>
        </footer>
    </div>
</body>
</html>"#,
        title = escape_html(title),
        authors = escape_html(&authors),
        venue = escape_html(venue),
        published = escape_html(published),
        badges = render_badges(&review_data["badges"]),
        claim_count = claims.len(),
        ok_items = ok_items,
        quality = render_quality_score(quality_score),
        claims_html = render_claims(&claims, citations),
        checklist_html = render_checklist(checklist),
        review_id = escape_html(review_id),
        doi = escape_html(review_data["doi"].as_str().unwrap_or("N/A")),
        version = escape_html(quality_score["version"].as_str().unwrap_or("v0.1.0")),
    )
}

fn render_badges(badges: &serde_json::Value) -> String {
    if badges.is_null() {
        return "<p>No badges available</p>".to_string();
    }

    let mut parts = Vec::new();
    if badges["claim_mapped"].as_bool() == Some(true) {
        parts.push("<span class=\"status-ok\">Claim-mapped</span>");
    }
    match badges["method_check"].as_str() {
        Some("ok") => parts.push("<span class=\"status-ok\">Method-check: OK</span>"),
        Some("partial") => parts.push("<span class=\"status-partial\">Method-check: Partial</span>"),
        _ => parts.push("<span class=\"status-missing\">Method-check: Fail</span>"),
    }
    if badges["citations_augmented"].as_bool() == Some(true) {
        parts.push("<span class=\"status-ok\">Citations-augmented</span>");
    }

    parts.join(" &middot; ")
}

fn render_quality_score(quality_score: &serde_json::Value) -> String {
    if quality_score.is_null() {
        return String::new();
    }

    let score = quality_score["value_0_100"].as_f64().unwrap_or(0.0);
    let tier = quality_score["tier"].as_str().unwrap_or("D");

    let mut shap_html = String::new();
    if let Some(shap) = quality_score["shap"].as_array() {
        if !shap.is_empty() {
            shap_html.push_str("<h3>Top Contributing Factors</h3><ul>");
            for item in shap.iter().take(5) {
                let feature = item["feature"].as_str().unwrap_or("");
                let phi = item["phi"].as_f64().unwrap_or(0.0);
                let class = if phi > 0.0 { "status-ok" } else { "status-missing" };
                shap_html.push_str(&format!(
                    "<li class=\"{class}\"><strong>{}:</strong> {phi:+.1}</li>",
                    escape_html(feature)
                ));
            }
            shap_html.push_str("</ul>");
        }
    }

    let mut narrative_html = String::new();
    if let Some(bullets) = quality_score["narrative"]["executive_justification"].as_array() {
        narrative_html.push_str("<h3>Executive Summary</h3><ul>");
        for bullet in bullets {
            narrative_html.push_str(&format!(
                "<li>{}</li>",
                escape_html(bullet.as_str().unwrap_or(""))
            ));
        }
        narrative_html.push_str("</ul>");
    }

    format!(
        r#"<section>
            <h2>Quality Score</h2>
            <div><span class="score tier-{tier}">{score:.1}</span> <span class="tier-{tier}">Tier {tier}</span></div>
            {shap_html}
            {narrative_html}
        </section>"#
    )
}

fn render_claims(claims: &[serde_json::Value], citations: &serde_json::Value) -> String {
    if claims.is_empty() {
        return "<p>No claims extracted</p>".to_string();
    }

    let mut html = String::new();
    for claim in claims {
        let id = claim["id"].as_str().unwrap_or("");
        let text = claim["text"].as_str().unwrap_or("");
        let section = claim["section"].as_str().unwrap_or("unknown");
        let confidence = claim["confidence"].as_f64().unwrap_or(0.0);

        let citation_count =
            citations[id].as_array().map(|c| c.len()).unwrap_or(0);

        html.push_str(&format!(
            "<div class=\"claim\"><p>{}</p><small>{} &middot; confidence {:.2} &middot; {} citation(s)</small></div>",
            escape_html(text),
            escape_html(section),
            confidence,
            citation_count
        ));
    }
    html
}

fn render_checklist(checklist: &serde_json::Value) -> String {
    let Some(items) = checklist["items"].as_array() else {
        return "<p>No checklist available</p>".to_string();
    };
    if items.is_empty() {
        return "<p>No checklist available</p>".to_string();
    }

    let mut html = String::from("<ul>");
    for item in items {
        let key = item["key"].as_str().unwrap_or("");
        let status = item["status"].as_str().unwrap_or("missing");
        let evidence = item["evidence"].as_str().unwrap_or("");
        html.push_str(&format!(
            "<li class=\"status-{status}\"><strong>{}</strong>: {status} {}</li>",
            escape_html(key),
            escape_html(evidence)
        ));
    }
    html.push_str("</ul>");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arandu_common::db::models::ReviewStatus;

    fn minimal_state() -> ReviewState {
        ReviewState {
            review_id: "review-1".into(),
            url: None,
            doi: Some("10.1/abc".into()),
            pdf_file_path: None,
            repo_url: None,
            paper_meta: None,
            paper_text: "We show X.".into(),
            claims: Some(vec![]),
            citations: None,
            checklist: None,
            quality_score: None,
            badges: None,
            html_report_path: None,
            json_summary_path: None,
            status: ReviewStatus::Completed,
            error_message: None,
            errors: vec![],
        }
    }

    #[test]
    fn test_json_report_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_review_data(&minimal_state());
        let path = dir.path().join("review.json");
        generate_json_report(&data, &path).unwrap();

        let reparsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reparsed, data);
        assert_eq!(reparsed["id"], "review-1");
        assert_eq!(reparsed["status"], "completed");
    }

    #[test]
    fn test_html_report_written() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_review_data(&minimal_state());
        let path = dir.path().join("report.html");
        generate_html_report(&data, &path).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("Untitled Paper"));
        assert!(html.contains("review-1"));
        assert!(html.contains("10.1/abc"));
    }

    #[test]
    fn test_html_escapes_content() {
        let mut state = minimal_state();
        state.paper_meta = Some(crate::ingestion::PaperMeta {
            title: Some("<script>alert(1)</script>".into()),
            authors: vec![],
            venue: None,
            published_at: None,
        });
        let data = build_review_data(&state);
        let html = build_html_content(&data);
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
