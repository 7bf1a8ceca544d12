//! Claim extraction
//!
//! Deterministic pattern-based extraction: sentences from the
//! introduction/results/discussion/conclusion sections are matched against
//! a small ordered set of claim markers, each carrying a confidence weight.
//! Very short sentences are rejected; near-duplicates are removed by their
//! first 100 lowercase characters.

use crate::segmenter::segment_paper;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Minimum sentence length considered for a claim
const MIN_SENTENCE_LEN: usize = 20;

/// A claim extracted from paper text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
    pub section: Option<String>,
    /// Character spans [[start, end]] into the full paper text
    pub spans: Vec<[usize; 2]>,
    pub confidence: f32,
}

fn claim_patterns() -> &'static Vec<(Regex, f32)> {
    static PATTERNS: OnceLock<Vec<(Regex, f32)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                r"(?i)\b(?:we|our|this|the)\s+(?:show|demonstrate|prove|establish|find|observe|propose|introduce|present|develop)\b",
                0.7,
            ),
            (
                r"(?i)\b(?:our|this|the)\s+(?:method|approach|model|system|framework|algorithm)\s+(?:achieves|obtains|yields|produces|improves)\b",
                0.8,
            ),
            (r"(?i)\b(?:state-of-the-art|SOTA|best|superior|outperforms|beats)\b", 0.6),
            (
                r"(?i)\b(?:significantly|substantially|considerably)\s+(?:improves?|outperforms?|better)\b",
                0.7,
            ),
            (
                r"(?i)\b(?:we|our)\s+(?:results?|experiments?|evaluation)\s+(?:show|demonstrate|indicate|suggest)\b",
                0.7,
            ),
            (r"(?i)\b(?:we|our)\s+(?:contributions?|novelty)\b", 0.6),
        ]
        .into_iter()
        .map(|(pattern, confidence)| {
            (Regex::new(pattern).expect("static claim regex"), confidence)
        })
        .collect()
    })
}

/// Extract claims from a block of text. `offset` shifts spans so they refer
/// to positions in the full paper text.
pub fn extract_claims_baseline(text: &str, section_name: Option<&str>, offset: usize) -> Vec<Claim> {
    let mut claims = Vec::new();
    let mut claim_id = 0usize;

    for sentence in split_sentences(text) {
        let sentence = sentence.trim();
        if sentence.len() < MIN_SENTENCE_LEN {
            continue;
        }

        let best_confidence = claim_patterns()
            .iter()
            .filter(|(re, _)| re.is_match(sentence))
            .map(|(_, confidence)| *confidence)
            .fold(0.0f32, f32::max);

        if best_confidence > 0.0 {
            let spans = match text.find(sentence) {
                Some(start) => vec![[offset + start, offset + start + sentence.len()]],
                None => vec![],
            };
            claims.push(Claim {
                id: format!("c{claim_id}"),
                text: sentence.to_string(),
                section: section_name.map(|s| s.to_string()),
                spans,
                confidence: best_confidence,
            });
            claim_id += 1;
        }
    }

    claims
}

/// Extract claims section by section, focusing on the sections where claims
/// live. Falls back to full-text extraction when no sections are found.
pub fn extract_claims_by_section(text: &str) -> Vec<Claim> {
    let sections = segment_paper(text);
    let mut all_claims = Vec::new();

    if sections.is_empty() {
        all_claims = extract_claims_baseline(text, None, 0);
    } else {
        for section in &sections {
            if matches!(section.name.as_str(), "introduction" | "results" | "discussion" | "conclusion")
            {
                all_claims.extend(extract_claims_baseline(
                    &section.text,
                    Some(&section.name),
                    section.start,
                ));
            }
        }
    }

    // Dedupe by the first 100 lowercase characters, then renumber.
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::new();
    for mut claim in all_claims {
        let key: String = claim.text.to_lowercase().chars().take(100).collect();
        if seen.insert(key) {
            claim.id = format!("c{}", unique.len());
            unique.push(claim);
        }
    }

    unique
}

/// Split text into sentences on terminal punctuation followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            if chars.peek().map(|c| c.is_whitespace()).unwrap_or(true) {
                let sentence = current.trim().to_string();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                current.clear();
            }
        }
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("First one. Second one! Third one? Unterminated tail");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one!", "Third one?", "Unterminated tail"]
        );
    }

    #[test]
    fn test_split_keeps_decimal_numbers_together() {
        let sentences = split_sentences("Accuracy is 92.5 percent overall. Second sentence.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("92.5 percent"));
    }

    #[test]
    fn test_short_sentences_rejected() {
        let claims = extract_claims_baseline("We show X.", None, 0);
        assert!(claims.is_empty());
    }

    #[test]
    fn test_marker_sets_confidence() {
        let claims =
            extract_claims_baseline("We demonstrate that our encoder helps downstream tasks.", None, 0);
        assert_eq!(claims.len(), 1);
        assert!((claims[0].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_strongest_marker_wins() {
        let claims = extract_claims_baseline(
            "Our method achieves results that significantly outperform prior work.",
            None,
            0,
        );
        assert_eq!(claims.len(), 1);
        assert!((claims[0].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_plain_sentences_not_claims() {
        let claims = extract_claims_baseline(
            "The dataset contains twelve thousand labelled molecules in total.",
            None,
            0,
        );
        assert!(claims.is_empty());
    }

    #[test]
    fn test_spans_index_into_text() {
        let text = "Filler sentence comes first here. We show that pruning preserves accuracy.";
        let claims = extract_claims_baseline(text, None, 0);
        assert_eq!(claims.len(), 1);
        let [start, end] = claims[0].spans[0];
        assert_eq!(&text[start..end], claims[0].text);
    }

    #[test]
    fn test_section_scoped_extraction() {
        let text = "Introduction\nWe propose a novel architecture for parsing.\n\nMethod\nWe demonstrate the layer wiring in detail here.\n\nResults\nOur model achieves superior accuracy on all tasks.";
        let claims = extract_claims_by_section(text);

        // Method-section sentences are not scanned.
        assert!(claims.iter().all(|c| c.section.as_deref() != Some("method")));
        assert!(claims.iter().any(|c| c.section.as_deref() == Some("introduction")));
        assert!(claims.iter().any(|c| c.section.as_deref() == Some("results")));
    }

    #[test]
    fn test_dedupe_by_prefix() {
        let text = "We show that caching helps throughput measurably. We show that caching helps throughput measurably.";
        let claims = extract_claims_by_section(text);
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_fallback_without_sections() {
        let claims = extract_claims_by_section("We propose X. We show Y improves Z over baselines.");
        assert!(!claims.is_empty());
        assert!(claims.iter().all(|c| c.section.is_none()));
    }
}
