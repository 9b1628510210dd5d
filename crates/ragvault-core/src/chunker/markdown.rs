//! Semantic Markdown chunking.

use regex::Regex;
use std::sync::LazyLock;

use super::{char_offsets, Chunk};
use crate::constants::{CHARS_PER_TOKEN, MIN_CHUNK_CHARS};

static ATX_HEADING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+(.+?)[ \t]*#*[ \t]*$").ok());

struct Section {
    heading: Option<String>,
    level: Option<u8>,
    body: String,
}

/// Split Markdown into one chunk per heading section.
///
/// Headings inside fenced code blocks are ignored. Sections longer than the
/// window are split at the last blank line past the half-window mark, or
/// hard cut. Pieces shorter than 20 characters after trimming are dropped.
pub fn chunk_markdown(text: &str, chunk_size: usize) -> Vec<Chunk> {
    let window = (chunk_size * CHARS_PER_TOKEN).max(1);
    let mut chunks = Vec::new();

    for section in split_sections(text) {
        for piece in split_section(&section.body, window) {
            let trimmed = piece.trim();
            if trimmed.chars().count() < MIN_CHUNK_CHARS {
                continue;
            }
            chunks.push(Chunk {
                text: trimmed.to_string(),
                heading: section.heading.clone(),
                heading_level: section.level,
                code: None,
            });
        }
    }

    chunks
}

fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = vec![Section {
        heading: None,
        level: None,
        body: String::new(),
    }];
    let mut fence: Option<&str> = None;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
        } else if trimmed.starts_with("```") {
            fence = Some("```");
        } else if trimmed.starts_with("~~~") {
            fence = Some("~~~");
        } else if let Some((level, heading)) = parse_heading(line) {
            sections.push(Section {
                heading: Some(heading),
                level: Some(level),
                body: String::new(),
            });
        }

        if let Some(current) = sections.last_mut() {
            current.body.push_str(line);
        }
    }

    sections
}

fn parse_heading(line: &str) -> Option<(u8, String)> {
    // ATX headings allow up to three spaces of indentation
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let caps = ATX_HEADING.as_ref()?.captures(line.trim())?;
    let level = caps.get(1)?.as_str().len() as u8;
    let heading = caps.get(2)?.as_str().trim().to_string();
    Some((level, heading))
}

/// Split an oversized section at paragraph breaks.
fn split_section(body: &str, window: usize) -> Vec<String> {
    let chars: Vec<char> = body.chars().collect();
    let n = chars.len();
    if n <= window {
        return vec![body.to_string()];
    }

    let offsets = char_offsets(body);
    let mut pieces = Vec::new();
    let mut start = 0usize;

    while start < n {
        let mut end = (start + window).min(n);
        if end < n {
            let half = start + window / 2;
            // last "\n\n" ending inside (half, end]
            for p in (half.max(start + 1) + 1..=end).rev() {
                if chars[p - 1] == '\n' && chars[p - 2] == '\n' {
                    end = p;
                    break;
                }
            }
        }
        pieces.push(body[offsets[start]..offsets[end]].to_string());
        start = end;
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_pattern_compiles() {
        assert!(ATX_HEADING.is_some());
    }

    #[test]
    fn test_sections_carry_headings() {
        let text = "Intro paragraph that is long enough to keep.\n\n\
                    # Install\n\nRun the installer and follow the prompts.\n\n\
                    ## Configure\n\nEdit config.yaml to point at your data.\n";
        let chunks = chunk_markdown(text, 512);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].heading, None);
        assert_eq!(chunks[1].heading.as_deref(), Some("Install"));
        assert_eq!(chunks[1].heading_level, Some(1));
        assert_eq!(chunks[2].heading.as_deref(), Some("Configure"));
        assert_eq!(chunks[2].heading_level, Some(2));
        assert!(chunks[2].text.starts_with("## Configure"));
    }

    #[test]
    fn test_headings_in_fences_ignored() {
        let text = "# Real\n\nSome text before the code block.\n\n```sh\n# not a heading\necho hi\n```\n";
        let chunks = chunk_markdown(text, 512);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("# not a heading"));
    }

    #[test]
    fn test_tiny_sections_dropped() {
        let text = "# A\n\nok\n\n# B\n\nThis section has enough characters.\n";
        let chunks = chunk_markdown(text, 512);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading.as_deref(), Some("B"));
    }

    #[test]
    fn test_oversized_section_split_at_paragraphs() {
        let para = "Lorem ipsum dolor sit amet consectetur. ".repeat(2); // 80 chars
        let text = format!("# Big\n\n{p}\n\n{p}\n\n{p}\n\n{p}\n", p = para.trim());
        let chunks = chunk_markdown(&text, 40); // window 160 chars
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.heading.as_deref() == Some("Big")));
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 160));
        // every paragraph survives whole
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined.matches("Lorem").count(), 8);
    }

    #[test]
    fn test_hard_cut_without_blank_lines() {
        let text = format!("# Wall\n{}", "x".repeat(500));
        let chunks = chunk_markdown(&text, 25); // window 100
        assert!(chunks.len() >= 5);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 100));
    }

    #[test]
    fn test_closing_hashes_stripped() {
        assert_eq!(parse_heading("### Title ###\n"), Some((3, "Title".to_string())));
        assert_eq!(parse_heading("#hashtag"), None);
        assert_eq!(parse_heading("####### seven"), None);
    }
}
