//! Paper ingestion: PDF/URL text extraction and metadata heuristics
//!
//! DOI-only input is refused; a DOI alongside a PDF or URL triggers a
//! best-effort Crossref metadata lookup when enabled.

use crate::pdf::extract_text_from_pdf;
use arandu_common::config::RagConfig;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Paper metadata extracted during ingestion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperMeta {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub published_at: Option<String>,
}

/// Ingested paper: metadata plus the full cleaned text
#[derive(Debug, Clone)]
pub struct IngestedPaper {
    pub meta: PaperMeta,
    pub text: String,
}

/// Ingest a paper from a PDF path or a URL. DOI alone is not enough.
pub async fn ingest_paper(
    url: Option<&str>,
    doi: Option<&str>,
    pdf_path: Option<&str>,
    rag_config: &RagConfig,
) -> Result<IngestedPaper, String> {
    let raw_text = if let Some(pdf_path) = pdf_path {
        extract_text_from_pdf(Path::new(pdf_path))?
    } else if let Some(url) = url {
        extract_text_from_url(url).await?
    } else if doi.is_some() {
        return Err("DOI-only ingestion requires URL or PDF file".to_string());
    } else {
        return Err("At least one of url, doi, or pdf_path must be provided".to_string());
    };

    let text = clean_text(&raw_text);
    let mut meta = extract_metadata_from_text(&text);

    // Best-effort enrichment; failures are logged, never fatal.
    if let Some(doi) = doi {
        if rag_config.crossref_enabled {
            match fetch_metadata_from_crossref(doi, &rag_config.crossref_mailto).await {
                Ok(Some(enhanced)) => merge_meta(&mut meta, enhanced),
                Ok(None) => {}
                Err(e) => warn!(doi, error = %e, "Crossref lookup failed"),
            }
        }
    }

    info!(chars = text.len(), "Paper ingested");
    Ok(IngestedPaper { meta, text })
}

/// Fetch a URL and strip HTML tags.
pub async fn extract_text_from_url(url: &str) -> Result<String, String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("Failed to fetch URL: {e}"))?
        .error_for_status()
        .map_err(|e| format!("Failed to fetch URL: {e}"))?;

    let body = response
        .text()
        .await
        .map_err(|e| format!("Failed to read URL body: {e}"))?;

    Ok(strip_html(&body))
}

/// Remove tags and skip script/style/nav/footer/header content
fn strip_html(html: &str) -> String {
    let mut text = String::new();
    let mut rest = html;
    let skip_tags = ["script", "style", "nav", "footer", "header"];

    while let Some(open) = rest.find('<') {
        let before = &rest[..open];
        if !before.trim().is_empty() {
            text.push_str(before.trim());
            text.push(' ');
        }

        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('>') else { break };
        let tag = after_open[..close].trim().to_lowercase();
        let tag_name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();

        rest = &after_open[close + 1..];

        // Skip over the entire element body for non-content tags.
        if skip_tags.contains(&tag_name.as_str()) && !tag.starts_with('/') && !tag.ends_with('/') {
            let close_marker = format!("</{tag_name}");
            if let Some(end) = rest.to_lowercase().find(&close_marker) {
                rest = &rest[end..];
                if let Some(gt) = rest.find('>') {
                    rest = &rest[gt + 1..];
                } else {
                    break;
                }
            }
        }
    }

    if !rest.trim().is_empty() {
        text.push_str(rest.trim());
    }

    text.trim().to_string()
}

/// Clean extracted text: drop repeated header/footer lines and normalise
/// whitespace.
pub fn clean_text(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    let cleaned_lines: Vec<&str> = if lines.len() > 6 {
        let first: std::collections::HashSet<&str> = lines[..3].iter().copied().collect();
        let last: std::collections::HashSet<&str> =
            lines[lines.len() - 3..].iter().copied().collect();
        let repeated: std::collections::HashSet<&str> =
            first.intersection(&last).copied().collect();

        lines
            .iter()
            .copied()
            .filter(|line| !repeated.contains(line) || line.trim().is_empty())
            .collect()
    } else {
        lines
    };

    // Collapse runs of spaces/tabs within lines, keep line structure.
    let mut out = String::new();
    for line in cleaned_lines {
        let collapsed: Vec<&str> = line.split_whitespace().collect();
        out.push_str(&collapsed.join(" "));
        out.push('\n');
    }

    // Collapse 3+ blank lines to one blank line.
    let re = Regex::new(r"\n{3,}").expect("static regex");
    re.replace_all(out.trim(), "\n\n").into_owned()
}

/// Heuristic metadata extraction: title from the first substantial line,
/// authors from an `Authors:` line, venue from known-publication patterns,
/// year from a four-digit match in the first 1000 characters.
pub fn extract_metadata_from_text(text: &str) -> PaperMeta {
    let mut meta = PaperMeta::default();

    let head: Vec<&str> = text.split('\n').take(20).collect();
    for line in &head {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.len() > 20
            && line.len() < 200
            && !line.starts_with("Abstract")
            && !line.starts_with("Introduction")
        {
            meta.title = Some(line.to_string());
            break;
        }
    }

    let author_re = Regex::new(r"(?i)(?:Authors?|By):\s*(.+)").expect("static regex");
    for line in &head {
        if let Some(caps) = author_re.captures(line) {
            let authors_str = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let split_re = Regex::new(r",\s*|\s+and\s+").expect("static regex");
            meta.authors = split_re
                .split(authors_str)
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            break;
        }
    }

    let prefix: String = text.chars().take(5000).collect();
    let venue_patterns = [
        r"(?:Proceedings of |Conference on |Journal of )[A-Z][A-Za-z\s]+",
        r"arXiv|ICML|NeurIPS|ICLR|AAAI|IJCAI",
    ];
    for pattern in venue_patterns {
        let re = Regex::new(pattern).expect("static regex");
        if let Some(m) = re.find(&prefix) {
            meta.venue = Some(m.as_str().trim().to_string());
            break;
        }
    }

    let year_prefix: String = text.chars().take(1000).collect();
    let year_re = Regex::new(r"\b(19|20)\d{2}\b").expect("static regex");
    if let Some(m) = year_re.find(&year_prefix) {
        meta.published_at = Some(m.as_str().to_string());
    }

    meta
}

fn merge_meta(meta: &mut PaperMeta, enhanced: PaperMeta) {
    if enhanced.title.is_some() {
        meta.title = enhanced.title;
    }
    if !enhanced.authors.is_empty() {
        meta.authors = enhanced.authors;
    }
    if enhanced.venue.is_some() {
        meta.venue = enhanced.venue;
    }
    if enhanced.published_at.is_some() {
        meta.published_at = enhanced.published_at;
    }
}

/// Crossref works lookup. Returns `Ok(None)` on missing fields.
pub async fn fetch_metadata_from_crossref(
    doi: &str,
    mailto: &str,
) -> Result<Option<PaperMeta>, String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| e.to_string())?;

    let url = format!("https://api.crossref.org/works/{doi}");
    let response = client
        .get(&url)
        .query(&[("mailto", mailto)])
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    let data: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
    let Some(message) = data.get("message") else {
        return Ok(None);
    };

    let title = message
        .get("title")
        .and_then(|t| t.as_array())
        .and_then(|a| a.first())
        .and_then(|t| t.as_str())
        .map(|s| s.to_string());

    let authors = message
        .get("author")
        .and_then(|a| a.as_array())
        .map(|authors| {
            authors
                .iter()
                .map(|a| {
                    let given = a.get("given").and_then(|g| g.as_str()).unwrap_or("");
                    let family = a.get("family").and_then(|f| f.as_str()).unwrap_or("");
                    format!("{given} {family}").trim().to_string()
                })
                .filter(|a| !a.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let venue = message
        .get("container-title")
        .and_then(|t| t.as_array())
        .and_then(|a| a.first())
        .and_then(|t| t.as_str())
        .map(|s| s.to_string());

    let published_at = message
        .get("published-print")
        .and_then(|p| p.get("date-parts"))
        .and_then(|d| d.as_array())
        .and_then(|a| a.first())
        .and_then(|a| a.as_array())
        .and_then(|a| a.first())
        .and_then(|y| y.as_i64())
        .map(|y| y.to_string());

    Ok(Some(PaperMeta { title, authors, venue, published_at }))
}
