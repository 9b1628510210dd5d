//! Chunking strategies.
//!
//! - [`chunk_plain`]: fixed character windows with overlap, snapped to
//!   sentence or line ends
//! - [`chunk_markdown`]: one chunk per heading section
//! - [`chunk_code`]: line scan split at declaration boundaries
//!
//! Token budgets are converted to characters at [`CHARS_PER_TOKEN`].
//! Every strategy returns ordered chunks with non-empty text.

mod code;
mod markdown;

pub use code::{chunk_code, extract_code_context};
pub use markdown::chunk_markdown;

use crate::config::IndexConfig;
use crate::constants::CHARS_PER_TOKEN;
use crate::document::Document;
use crate::types::{CodeContext, FileType};

/// A retrievable unit of text with optional structural metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Enclosing Markdown heading, if any.
    pub heading: Option<String>,
    /// Heading level (1-6).
    pub heading_level: Option<u8>,
    /// Code metadata for code chunks.
    pub code: Option<CodeContext>,
}

impl Chunk {
    /// A chunk with no structural metadata.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            heading: None,
            heading_level: None,
            code: None,
        }
    }
}

/// Pick the strategy for a document and chunk it.
///
/// Markdown with semantic chunking enabled is split by headings, code is
/// split by declarations, everything else (PDF text included) uses plain
/// windows.
pub fn chunk_document(doc: &Document, config: &IndexConfig) -> Vec<Chunk> {
    match doc.file_type {
        FileType::Markdown if config.semantic_chunking => {
            chunk_markdown(&doc.content, config.chunk_size)
        }
        FileType::Code => chunk_code(
            &doc.content,
            doc.language.unwrap_or("generic"),
            config.chunk_size,
            config.chunk_overlap,
        ),
        _ => chunk_plain(&doc.content, config.chunk_size, config.chunk_overlap),
    }
}

// ============================================================================
// Plain-text chunking
// ============================================================================

/// Split plain text into overlapping windows.
pub fn chunk_plain(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let offsets = char_offsets(text);
    plain_windows(text, chunk_size, overlap)
        .into_iter()
        .filter_map(|(start, end)| {
            let piece = text[offsets[start]..offsets[end]].trim();
            (!piece.is_empty()).then(|| Chunk::plain(piece))
        })
        .collect()
}

/// Compute plain-text windows as `(start, end)` character positions.
///
/// The window is `chunk_size * 4` characters. When the window does not reach
/// the end of the text, its end snaps back to the last sentence end or
/// newline past the half-window mark. The next window starts `overlap * 4`
/// characters before the end, or at the end if that would not advance.
/// Starts are strictly increasing.
pub fn plain_windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let window = (chunk_size * CHARS_PER_TOKEN).max(1);
    let overlap_chars = overlap * CHARS_PER_TOKEN;

    let mut windows = Vec::new();
    let mut start = 0usize;

    while start < n {
        let mut end = (start + window).min(n);

        if end < n {
            let half = start + window / 2;
            for p in (half + 1..=end).rev() {
                let prev = chars[p - 1];
                let sentence_end =
                    matches!(prev, '.' | '!' | '?') && p < n && chars[p].is_whitespace();
                if prev == '\n' || sentence_end {
                    end = p;
                    break;
                }
            }
        }

        windows.push((start, end));

        if end >= n {
            break;
        }

        let mut next = end.saturating_sub(overlap_chars);
        if next <= start {
            next = end;
        }
        start = next;
    }

    windows
}

/// Byte offset of every character position, plus the text length.
pub(crate) fn char_offsets(text: &str) -> Vec<usize> {
    let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    offsets.push(text.len());
    offsets
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_plain("Just one sentence.", 512, 50);
        assert_eq!(chunks, vec![Chunk::plain("Just one sentence.")]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_plain("", 10, 2).is_empty());
        assert!(chunk_plain("   \n\n ", 10, 2).is_empty());
    }

    #[test]
    fn test_snaps_to_sentence_end() {
        // window = 40 chars, half = 20
        let text = "The first sentence is here. The second one runs on and on and on.";
        let windows = plain_windows(text, 10, 0);
        let first = &text[..windows[0].1];
        assert_eq!(first, "The first sentence is here.");
    }

    #[test]
    fn test_forward_progress_with_large_overlap() {
        let text = "word ".repeat(400);
        for (size, overlap) in [(1, 0), (2, 1), (10, 9), (16, 15), (50, 3), (7, 6)] {
            let windows = plain_windows(&text, size, overlap);
            assert!(!windows.is_empty());
            for pair in windows.windows(2) {
                assert!(pair[1].0 > pair[0].0, "size={} overlap={}", size, overlap);
            }
            assert_eq!(windows.last().unwrap().1, text.chars().count());
        }
    }

    #[test]
    fn test_newline_heavy_text_terminates() {
        // Newlines right after every char force the earliest possible snap
        let text = "a\n".repeat(1000);
        let windows = plain_windows(&text, 3, 2);
        for pair in windows.windows(2) {
            assert!(pair[1].0 > pair[0].0);
        }
    }

    #[test]
    fn test_multibyte_text() {
        let text = "héllo wörld. ".repeat(50);
        let chunks = chunk_plain(&text, 8, 2);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| !c.text.is_empty()));
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let text = "abcdefghij".repeat(10); // 100 chars, no boundaries
        let windows = plain_windows(&text, 10, 2); // window 40, overlap 8
        assert_eq!(windows[0], (0, 40));
        assert_eq!(windows[1], (32, 72));
    }

    #[test]
    fn test_chunk_document_selection() {
        let config = IndexConfig::default();
        let md = Document {
            path: PathBuf::from("a.md"),
            file_type: FileType::Markdown,
            language: None,
            content: "# Title\n\nA paragraph long enough to be kept as a chunk.\n".into(),
        };
        let chunks = chunk_document(&md, &config);
        assert_eq!(chunks[0].heading.as_deref(), Some("Title"));

        let flat = IndexConfig {
            semantic_chunking: false,
            ..Default::default()
        };
        let chunks = chunk_document(&md, &flat);
        assert!(chunks[0].heading.is_none());

        let code = Document {
            path: PathBuf::from("b.py"),
            file_type: FileType::Code,
            language: Some("python"),
            content: "def hello():\n    return 1\n".into(),
        };
        let chunks = chunk_document(&code, &config);
        assert_eq!(chunks[0].code.as_ref().unwrap().functions, vec!["hello"]);
    }
}
