//! Document file parsing and text extraction.

use sift_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Document formats accepted by ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markdown,
    Html,
    PlainText,
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "txt" | "text" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Pdf => "pdf",
        }
    }
}

/// Whether ingestion knows how to read this file.
pub fn is_supported(path: &Path) -> bool {
    DocumentFormat::from_path(path).is_some()
}

/// Parse a document and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        AppError::Knowledge(format!(
            "Unsupported document type: {}",
            path.extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default()
        ))
    })?;

    match format {
        DocumentFormat::Pdf => extract_pdf_text(path),
        DocumentFormat::Markdown => Ok(clean_markdown(&read_text(path)?)),
        DocumentFormat::Html => Ok(clean_html(&read_text(path)?)),
        DocumentFormat::PlainText => read_text(path),
    }
}

fn read_text(path: &Path) -> AppResult<String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if raw.contains('\0') {
        return Err(AppError::Knowledge(format!(
            "Binary content in {:?} is not supported",
            path
        )));
    }
    Ok(raw)
}

/// Extract the text layer of a PDF, page by page.
///
/// Pages that fail to decode are skipped. A PDF with no text layer at all
/// (scanned images) is an error.
fn extract_pdf_text(path: &Path) -> AppResult<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to load PDF {:?}: {}", path, e)))?;

    let pages = doc.get_pages();
    tracing::debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(page_text.trim());
                text.push('\n');
            }
            Err(e) => {
                tracing::warn!(page = page_number, "Skipping unreadable PDF page: {}", e);
            }
        }
    }

    let text = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return Err(AppError::Knowledge(format!(
            "No text content extracted from PDF {:?}",
            path
        )));
    }
    Ok(text)
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        // Horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Clean HTML by stripping tags, scripts and styles.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;
            let rest = tag_prefix(&text[i..]);
            if rest.starts_with("<script") {
                in_script = true;
            } else if rest.starts_with("</script") {
                in_script = false;
            } else if rest.starts_with("<style") {
                in_style = true;
            } else if rest.starts_with("</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased first eight characters of a tag, enough to spot script/style.
fn tag_prefix(tag: &str) -> String {
    tag.chars()
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase()
}
