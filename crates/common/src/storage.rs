//! Paper storage paths, AID generation, and PDF validation
//!
//! Hosted PDFs live at `papers/<aid>/v<version>/file.pdf` relative to the
//! configured papers base. AIDs are 12-character URL-safe identifiers.

use rand::Rng;
use std::path::{Path, PathBuf};

/// URL-safe AID alphabet
const AID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Length of generated AIDs
pub const AID_LENGTH: usize = 12;

/// Generate a stable, URL-safe paper identifier.
pub fn generate_aid() -> String {
    let mut rng = rand::thread_rng();
    (0..AID_LENGTH)
        .map(|_| AID_ALPHABET[rng.gen_range(0..AID_ALPHABET.len())] as char)
        .collect()
}

/// Check that an AID contains only alphanumerics, `-`, `_`.
pub fn is_valid_aid(aid: &str) -> bool {
    !aid.is_empty() && aid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Build the storage path for a paper version file, relative to the papers
/// base. Rejects malformed AIDs, versions below 1, and filenames carrying
/// path separators or traversal components.
pub fn paper_version_path(aid: &str, version: i32, filename: &str) -> Result<PathBuf, String> {
    if !is_valid_aid(aid) {
        return Err(format!("Invalid AID format: {aid}"));
    }
    if version < 1 {
        return Err(format!("Version must be >= 1: {version}"));
    }
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(format!("Invalid filename: {filename}"));
    }

    Ok(PathBuf::from("papers").join(aid).join(format!("v{version}")).join(filename))
}

/// Ensure the papers base and the directory for a version exist, returning
/// the absolute file path.
pub fn ensure_paper_version_dir(
    papers_base: &Path,
    aid: &str,
    version: i32,
) -> Result<PathBuf, String> {
    let rel = paper_version_path(aid, version, "file.pdf")?;
    let full = papers_base.join(rel);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("Cannot create papers dir: {e}"))?;
    }
    Ok(full)
}

/// Validate a PDF payload: size bound and `%PDF` magic header. Returns a
/// human-readable reason on rejection.
pub fn validate_pdf_bytes(bytes: &[u8], max_size_bytes: u64) -> Result<(), String> {
    if bytes.len() as u64 > max_size_bytes {
        return Err(format!(
            "File too large: {} bytes > {} bytes",
            bytes.len(),
            max_size_bytes
        ));
    }
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err("Invalid PDF header".to_string());
    }
    Ok(())
}

/// Validate a PDF on disk (size bound, extension fallback, magic header).
pub fn validate_pdf_file(path: &Path, max_size_bytes: u64) -> Result<(), String> {
    let meta = std::fs::metadata(path).map_err(|_| "File does not exist".to_string())?;
    if meta.len() > max_size_bytes {
        return Err(format!(
            "File too large: {} bytes > {} bytes",
            meta.len(),
            max_size_bytes
        ));
    }

    if path.extension().map(|e| e.to_ascii_lowercase()) != Some("pdf".into()) {
        return Err(format!("Invalid file extension: {}", path.display()));
    }

    let mut header = [0u8; 4];
    use std::io::Read;
    let mut file = std::fs::File::open(path).map_err(|e| format!("Error reading file: {e}"))?;
    file.read_exact(&mut header)
        .map_err(|e| format!("Error reading file: {e}"))?;
    if &header != b"%PDF" {
        return Err("Invalid PDF header".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_aid_shape() {
        let aid = generate_aid();
        assert_eq!(aid.len(), AID_LENGTH);
        assert!(is_valid_aid(&aid));
    }

    #[test]
    fn test_aid_validation() {
        assert!(is_valid_aid("abc-DEF_123"));
        assert!(!is_valid_aid(""));
        assert!(!is_valid_aid("has space"));
        assert!(!is_valid_aid("dot.dot"));
    }

    #[test]
    fn test_paper_version_path() {
        let path = paper_version_path("abc123", 2, "file.pdf").unwrap();
        assert_eq!(path, PathBuf::from("papers/abc123/v2/file.pdf"));
    }

    #[test]
    fn test_paper_version_path_rejections() {
        assert!(paper_version_path("bad aid", 1, "file.pdf").is_err());
        assert!(paper_version_path("abc", 0, "file.pdf").is_err());
        assert!(paper_version_path("abc", -1, "file.pdf").is_err());
        assert!(paper_version_path("abc", 1, "../escape.pdf").is_err());
        assert!(paper_version_path("abc", 1, "a/b.pdf").is_err());
        assert!(paper_version_path("abc", 1, "a\\b.pdf").is_err());
    }

    #[test]
    fn test_validate_pdf_bytes() {
        assert!(validate_pdf_bytes(b"%PDF-1.7 rest", 1024).is_ok());
        assert!(validate_pdf_bytes(b"<html>", 1024).is_err());
        assert!(validate_pdf_bytes(b"%PDF", 3).is_err());
    }

    #[test]
    fn test_validate_pdf_bytes_boundary() {
        let exactly = vec![b'%', b'P', b'D', b'F'];
        assert!(validate_pdf_bytes(&exactly, 4).is_ok());
        let over = b"%PDF-".to_vec();
        assert!(validate_pdf_bytes(&over, 4).is_err());
    }

    #[test]
    fn test_validate_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("doc.pdf");
        std::fs::write(&ok, b"%PDF-1.4 content").unwrap();
        assert!(validate_pdf_file(&ok, 1024).is_ok());

        let wrong_ext = dir.path().join("doc.txt");
        std::fs::write(&wrong_ext, b"%PDF-1.4 content").unwrap();
        assert!(validate_pdf_file(&wrong_ext, 1024).is_err());

        let bad_header = dir.path().join("fake.pdf");
        std::fs::write(&bad_header, b"hello world").unwrap();
        assert!(validate_pdf_file(&bad_header, 1024).is_err());
    }
}
