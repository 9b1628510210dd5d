//! Document loading: file type detection, text extraction, PDF normalization.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::constants::should_ignore_dir;
use crate::errors::RagError;
use crate::types::FileType;

/// A loaded source document. Transient: lives for one indexing call.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub file_type: FileType,
    /// Language tag for code files (e.g. "rust", "python").
    pub language: Option<&'static str>,
    pub content: String,
}

// ============================================================================
// Detection
// ============================================================================

/// Map a file extension to a programming language tag.
pub fn extension_to_language(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        // Rust
        "rs" => Some("rust"),
        // JavaScript/TypeScript
        "js" | "mjs" | "cjs" | "jsx" => Some("javascript"),
        "ts" | "mts" | "cts" | "tsx" => Some("typescript"),
        // Python
        "py" | "pyi" | "pyw" => Some("python"),
        // Go
        "go" => Some("go"),
        // Java/Kotlin
        "java" => Some("java"),
        "kt" | "kts" => Some("kotlin"),
        // C/C++
        "c" | "h" => Some("c"),
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some("cpp"),
        // C#
        "cs" => Some("csharp"),
        // Ruby
        "rb" | "rake" => Some("ruby"),
        // PHP
        "php" => Some("php"),
        // Swift
        "swift" => Some("swift"),
        // Scripting / misc code
        "sh" | "bash" | "zsh" => Some("shell"),
        "sql" => Some("sql"),
        "scala" => Some("scala"),
        "dart" => Some("dart"),
        "lua" => Some("lua"),
        _ => None,
    }
}

/// Detect the document type from the path's extension.
pub fn detect_file_type(path: &Path) -> FileType {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "md" | "markdown" | "mdx" => FileType::Markdown,
        "pdf" => FileType::Pdf,
        _ if extension_to_language(&ext).is_some() => FileType::Code,
        _ => FileType::Text,
    }
}

/// Language tag for a path, if it is a code file.
pub fn language_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(extension_to_language)
}

// ============================================================================
// Loading
// ============================================================================

/// Load a document from disk.
///
/// Fails with [`RagError::Parse`] for unreadable, binary, protected or empty
/// files; the indexer skips those and moves on.
pub fn load_document(path: &Path) -> Result<Document, RagError> {
    let file_type = detect_file_type(path);
    debug!("Loading {} as {}", path.display(), file_type);

    let content = match file_type {
        FileType::Pdf => {
            let bytes = fs::read(path).map_err(|e| RagError::parse(path, e.to_string()))?;
            let raw = extract_pdf_text(&bytes).map_err(|e| RagError::parse(path, e))?;
            normalize_pdf_text(&raw)
        }
        _ => {
            let bytes = fs::read(path).map_err(|e| RagError::parse(path, e.to_string()))?;
            String::from_utf8(bytes)
                .map_err(|_| RagError::parse(path, "file is not valid UTF-8 text"))?
        }
    };

    if content.trim().is_empty() {
        return Err(RagError::parse(path, "document has no extractable text"));
    }

    Ok(Document {
        path: path.to_path_buf(),
        file_type,
        language: if file_type == FileType::Code {
            language_for_path(path)
        } else {
            None
        },
        content,
    })
}

/// Extract text from PDF bytes. Encrypted or malformed files fail here.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, String> {
    // pdf-extract panics on some malformed inputs instead of returning an error
    catch_parser_panic(|| pdf_extract::extract_text_from_mem(bytes))?
        .map_err(|e| {
            let msg = e.to_string();
            if msg.to_lowercase().contains("encrypt") {
                format!("PDF is password-protected: {}", msg)
            } else {
                format!("PDF could not be parsed: {}", msg)
            }
        })
}

/// Turn a parser panic into an error. Relies on the release profile unwinding.
fn catch_parser_panic<T>(parse: impl FnOnce() -> T + std::panic::UnwindSafe) -> Result<T, String> {
    std::panic::catch_unwind(parse).map_err(|_| "PDF parser failed on malformed input".to_string())
}

static PAGE_NUMBER_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:page\s+)?\d{1,4}(?:\s*(?:/|of)\s*\d{1,4})?\s*$").ok()
});

static HORIZONTAL_WS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").ok());

/// Normalize extracted PDF text.
///
/// Form feeds become paragraph breaks, bare page-number lines are dropped,
/// horizontal whitespace runs collapse to one space, and runs of blank
/// lines collapse to one.
pub fn normalize_pdf_text(raw: &str) -> String {
    let text = raw.replace('\r', "").replace('\u{c}', "\n\n");
    let mut out: Vec<String> = Vec::new();
    let mut blank_run = 0usize;

    for line in text.lines() {
        if let Some(re) = PAGE_NUMBER_LINE.as_ref() {
            if re.is_match(line) {
                trace!("Dropping page-number line {:?}", line);
                continue;
            }
        }

        let collapsed = match HORIZONTAL_WS.as_ref() {
            Some(re) => re.replace_all(line, " ").trim().to_string(),
            None => line.trim().to_string(),
        };

        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push(String::new());
            }
        } else {
            blank_run = 0;
            out.push(collapsed);
        }
    }

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

// ============================================================================
// Path expansion
// ============================================================================

/// Expand directories into the files beneath them.
///
/// Files are kept in input order; each directory contributes its files
/// sorted by path. Ignored directories (`.git`, `target`, ...) are skipped.
pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || !e.file_type().is_dir()
                        || !e.file_name().to_str().is_some_and(should_ignore_dir)
                })
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }

    files
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalization_patterns_compile() {
        assert!(PAGE_NUMBER_LINE.is_some());
        assert!(HORIZONTAL_WS.is_some());
    }

    #[test]
    fn test_parser_panic_becomes_error() {
        let err = catch_parser_panic(|| -> String { panic!("bad xref table") }).unwrap_err();
        assert!(err.contains("malformed"));
        assert_eq!(catch_parser_panic(|| 7).unwrap(), 7);
    }

    #[test]
    fn test_release_profile_unwinds() {
        // catch_parser_panic is a no-op under panic = "abort"
        let manifest = include_str!("../../../Cargo.toml");
        let release = manifest
            .split("[profile.release]")
            .nth(1)
            .and_then(|rest| rest.split("\n[").next())
            .expect("release profile");
        assert!(!release.contains("panic = \"abort\""));
    }

    #[test]
    fn test_detect_file_type() {
        assert_eq!(detect_file_type(Path::new("a.md")), FileType::Markdown);
        assert_eq!(detect_file_type(Path::new("b.PY")), FileType::Code);
        assert_eq!(detect_file_type(Path::new("c.pdf")), FileType::Pdf);
        assert_eq!(detect_file_type(Path::new("d.txt")), FileType::Text);
        assert_eq!(detect_file_type(Path::new("Makefile")), FileType::Text);
        assert_eq!(language_for_path(Path::new("x.tsx")), Some("typescript"));
    }

    #[test]
    fn test_normalize_pdf_text() {
        let raw = "Intro   text\there\n\n\n\n12\nPage 3 of 10\nmore\u{c}next   page\n\n";
        let out = normalize_pdf_text(raw);
        assert_eq!(out, "Intro text here\n\nmore\n\nnext page");
    }

    #[test]
    fn test_load_text_and_empty() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("main.rs");
        fs::write(&good, "fn main() {}\n").unwrap();
        let doc = load_document(&good).unwrap();
        assert_eq!(doc.file_type, FileType::Code);
        assert_eq!(doc.language, Some("rust"));

        let empty = temp.path().join("empty.txt");
        fs::write(&empty, "   \n").unwrap();
        assert!(matches!(
            load_document(&empty),
            Err(RagError::Parse { .. })
        ));

        let binary = temp.path().join("blob.txt");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x81]).unwrap();
        assert!(load_document(&binary).is_err());
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let pdf = temp.path().join("broken.pdf");
        fs::write(&pdf, b"%PDF-1.4\nthis is not really a pdf").unwrap();
        assert!(matches!(load_document(&pdf), Err(RagError::Parse { .. })));
    }

    #[test]
    fn test_expand_paths_skips_ignored_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/b.rs"), "fn b() {}").unwrap();
        fs::write(root.join("a.md"), "# A").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();

        let single = root.join("a.md");
        let files = expand_paths(&[single.clone(), root.to_path_buf()]);
        assert_eq!(files[0], single);
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| !f.to_string_lossy().contains("node_modules")));
    }
}
