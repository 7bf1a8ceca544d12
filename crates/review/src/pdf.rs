//! PDF text extraction
//!
//! Primary path uses lopdf's text extraction; when that fails or yields
//! nothing, a content-stream fallback walks BT/ET text blocks directly.

use std::path::Path;
use tracing::{debug, warn};

/// Extract text content from a PDF file.
pub fn extract_text_from_pdf(path: &Path) -> Result<String, String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| format!("Failed to load PDF {}: {e}", path.display()))?;

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let text = match doc.extract_text(&pages) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => {
            warn!(path = %path.display(), "Primary extraction empty, using content-stream fallback");
            extract_via_content_streams(&doc)
        }
    };

    if text.trim().is_empty() {
        return Err(format!(
            "No text content extracted from PDF: {}",
            path.display()
        ));
    }

    Ok(text)
}

/// Fallback extractor: walk each page's content stream and pull text
/// between BT and ET operators.
fn extract_via_content_streams(doc: &lopdf::Document) -> String {
    let mut text = String::new();
    for (_, page_id) in doc.get_pages() {
        match doc.get_page_content(page_id) {
            Ok(content) => {
                text.push_str(&extract_text_from_content(&content));
                text.push('\n');
            }
            Err(e) => {
                warn!(error = %e, "Failed to read page content, skipping");
            }
        }
    }
    text
}

fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;

    for line in content_str.lines() {
        let trimmed = line.trim();
        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }
        if trimmed == "ET" {
            in_text_block = false;
            text.push(' ');
            continue;
        }
        if in_text_block {
            if let Some(fragment) = extract_text_from_operator(trimmed) {
                text.push_str(&fragment);
            }
        }
    }

    text
}

/// Pull the string arguments of Tj / ' / " / TJ show operators
fn extract_text_from_operator(line: &str) -> Option<String> {
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        let start = line.find('(')?;
        let end = line.rfind(')')?;
        if end > start {
            return Some(decode_pdf_string(&line[start + 1..end]));
        }
        return None;
    }

    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();
        for ch in line.chars() {
            match ch {
                '(' => in_paren = true,
                ')' => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => current.push(ch),
                _ => {}
            }
        }
        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string("Hello\\nWorld"), "Hello\nWorld");
        assert_eq!(decode_pdf_string("Test\\(paren\\)"), "Test(paren)");
        assert_eq!(decode_pdf_string("plain"), "plain");
    }

    #[test]
    fn test_extract_tj_operator() {
        assert_eq!(extract_text_from_operator("(Hello) Tj"), Some("Hello".to_string()));
        assert_eq!(
            extract_text_from_operator("[(Hel) -20 (lo)] TJ"),
            Some("Hello".to_string())
        );
        assert_eq!(extract_text_from_operator("1 0 0 1 72 720 Tm"), None);
    }

    #[test]
    fn test_extract_from_content_stream() {
        let content = b"BT\n/F1 12 Tf\n(First line) Tj\nET\nBT\n(Second) Tj\nET\n";
        let text = extract_text_from_content(content);
        assert!(text.contains("First line"));
        assert!(text.contains("Second"));
    }

    #[test]
    fn test_missing_file_errors() {
        let err = extract_text_from_pdf(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(err.contains("Failed to load PDF"));
    }
}
