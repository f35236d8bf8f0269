//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Chunk text into overlapping segments.
///
/// Whitespace runs are collapsed to single spaces first, then the text is
/// cut into `chunk_size`-character windows that advance by
/// `chunk_size - overlap` (or by `chunk_size` when the overlap is not
/// smaller than the window).
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let chars: Vec<char> = normalized.chars().collect();
    let step = if overlap < chunk_size {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk_text: String = chars[start..end].iter().collect();

        chunks.push(ChunkCandidate {
            source_id: source_id.to_string(),
            position,
            text: chunk_text,
            metadata: serde_json::json!({
                "start": start,
                "end": end,
            }),
        });

        position += 1;
        if end == chars.len() {
            break;
        }
        start += step;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text("test-source", &text, 200, 50);

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].metadata["start"], 150);
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text("test-source", &text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("test-source", "", 100, 10).is_empty());
        assert!(chunk_text("test-source", "  \n\t ", 100, 10).is_empty());
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let chunks = chunk_text("s", "alpha \n\n  beta\tgamma", 100, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "alpha beta gamma");
    }

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text("test-source", &text, 50, 10);

        assert!(chunks.len() >= 2);
        let first_tail: String = chunks[0].text.chars().skip(40).collect();
        let second_head: String = chunks[1].text.chars().take(10).collect();
        assert_eq!(first_tail, second_head);
    }

    #[test]
    fn test_overlap_not_smaller_than_size() {
        let text = "x".repeat(30);
        let chunks = chunk_text("s", &text, 10, 10);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "é".repeat(25);
        let chunks = chunk_text("s", &text, 10, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text.chars().count(), 5);
    }
}
