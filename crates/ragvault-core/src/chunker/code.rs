//! Code-aware chunking and best-effort symbol extraction.
//!
//! Boundaries and symbols come from per-language regexes, not a parser, so
//! results are approximate.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::Chunk;
use crate::constants::CHARS_PER_TOKEN;
use crate::types::CodeContext;

// ============================================================================
// Language patterns
// ============================================================================

struct PatternSpec {
    boundary: &'static [&'static str],
    functions: &'static [&'static str],
    classes: &'static [&'static str],
    imports: &'static [&'static str],
    exports: &'static [&'static str],
}

struct LanguagePatterns {
    boundary: Vec<Regex>,
    functions: Vec<Regex>,
    classes: Vec<Regex>,
    imports: Vec<Regex>,
    exports: Vec<Regex>,
}

const RUST: PatternSpec = PatternSpec {
    boundary: &[
        r"^\s*(?:#\[|///)",
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+\S+\s+)?(?:fn|struct|enum|trait|impl|mod|macro_rules!)\b",
    ],
    functions: &[r"\bfn\s+([A-Za-z_]\w*)"],
    classes: &[r"\b(?:struct|enum|trait|union)\s+([A-Za-z_]\w*)"],
    imports: &[r"(?m)^\s*(?:pub\s+)?use\s+([^;]+);"],
    exports: &[
        r"(?m)^\s*pub\s+(?:async\s+)?(?:unsafe\s+)?(?:fn|struct|enum|trait|mod|const|static|type)\s+([A-Za-z_]\w*)",
    ],
};

const PYTHON: PatternSpec = PatternSpec {
    // top-level only; methods stay with their class
    boundary: &[r"^(?:@\w|(?:async\s+)?def\s|class\s)"],
    functions: &[r"(?m)^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)"],
    classes: &[r"(?m)^\s*class\s+([A-Za-z_]\w*)"],
    imports: &[r"(?m)^\s*from\s+([\w.]+)\s+import", r"(?m)^\s*import\s+([\w.]+)"],
    exports: &[
        r"(?m)^(?:async\s+)?def\s+([A-Za-z]\w*)",
        r"(?m)^class\s+([A-Za-z]\w*)",
    ],
};

const JS_TS: PatternSpec = PatternSpec {
    boundary: &[
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?(?:function|class|interface|enum|type\s+\w+\s*=)",
        r"^\s*(?:export\s+)?(?:const|let|var)\s+[A-Za-z_$][\w$]*\s*=\s*(?:async\s*)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
    ],
    functions: &[
        r"\bfunction\s*\*?\s*([A-Za-z_$][\w$]*)",
        r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s*)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
    ],
    classes: &[r"\b(?:class|interface)\s+([A-Za-z_$][\w$]*)"],
    imports: &[
        r#"import\s+(?:[^'"]*?\s+from\s+)?['"]([^'"]+)['"]"#,
        r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
    ],
    exports: &[
        r"\bexport\s+(?:default\s+)?(?:async\s+)?(?:function\s*\*?|class|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)",
    ],
};

const GO: PatternSpec = PatternSpec {
    boundary: &[r"^(?:func\s|type\s+\w+\s+(?:struct|interface))"],
    functions: &[r"(?m)^func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)"],
    classes: &[r"(?m)^type\s+([A-Za-z_]\w*)\s+(?:struct|interface)"],
    imports: &[r#"(?m)^\s*import\s+(?:\w+\s+)?"([^"]+)""#, r#"(?m)^\s+(?:\w+\s+)?"([^"]+)"\s*$"#],
    exports: &[
        r"(?m)^func\s+(?:\([^)]*\)\s*)?([A-Z]\w*)",
        r"(?m)^type\s+([A-Z]\w*)",
    ],
};

const JAVA_LIKE: PatternSpec = PatternSpec {
    boundary: &[
        r"^\s*@\w+",
        r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|sealed|open|data|override|virtual|async|synchronized|partial|suspend|inline)\s+)*(?:class|interface|enum|record|struct|object|fun)\s",
        r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|override|virtual|async|synchronized)\s+)+[\w<>\[\],. ?]+\s+\w+\s*\(",
    ],
    functions: &[
        r"\bfun\s+(?:<[^>]*>\s*)?(?:\w+\.)?([A-Za-z_]\w*)",
        r"(?m)^\s*(?:(?:public|private|protected|internal|static|final|abstract|override|virtual|async|synchronized)\s+)+[\w<>\[\],. ?]+\s+([A-Za-z_]\w*)\s*\(",
    ],
    classes: &[r"\b(?:class|interface|enum|record|struct|object)\s+([A-Z]\w*)"],
    imports: &[r"(?m)^\s*import\s+(?:static\s+)?([\w.*]+)", r"(?m)^\s*using\s+([\w.]+)\s*;"],
    exports: &[
        r"(?m)^\s*public\s+(?:(?:static|final|abstract|sealed|partial)\s+)*(?:class|interface|enum|record|struct)\s+([A-Z]\w*)",
    ],
};

const C_CPP: PatternSpec = PatternSpec {
    boundary: &[
        r"^(?:static\s+|inline\s+|extern\s+|virtual\s+)*[A-Za-z_][\w:<>*&\s]*\s+\**[A-Za-z_~][\w:~]*\s*\([^;]*$",
        r"^\s*(?:class|struct|namespace|template\s*<)\b",
    ],
    functions: &[r"(?m)^[A-Za-z_][\w:<>*&\s]*\s+\**([A-Za-z_~][\w:~]*)\s*\([^;]*$"],
    classes: &[r"\b(?:class|struct)\s+([A-Za-z_]\w*)\s*(?:[:{]|$)"],
    imports: &[r#"(?m)^\s*#\s*include\s*[<"]([^>"]+)[>"]"#],
    exports: &[],
};

const RUBY: PatternSpec = PatternSpec {
    boundary: &[r"^\s*(?:def|class|module)\s"],
    functions: &[r"\bdef\s+(?:self\.)?([a-zA-Z_]\w*[!?]?)"],
    classes: &[r"\b(?:class|module)\s+([A-Z]\w*)"],
    imports: &[r#"(?m)^\s*require(?:_relative)?\s+['"]([^'"]+)['"]"#],
    exports: &[],
};

const PHP: PatternSpec = PatternSpec {
    boundary: &[
        r"^\s*(?:(?:public|private|protected|static|abstract|final)\s+)*(?:function|class|interface|trait)\s",
    ],
    functions: &[r"\bfunction\s+&?([A-Za-z_]\w*)"],
    classes: &[r"\b(?:class|interface|trait)\s+([A-Za-z_]\w*)"],
    imports: &[r"(?m)^\s*use\s+([\w\\]+)", r#"(?m)^\s*(?:require|include)(?:_once)?\s*\(?\s*['"]([^'"]+)['"]"#],
    exports: &[],
};

const SWIFT: PatternSpec = PatternSpec {
    boundary: &[
        r"^\s*(?:(?:public|private|internal|fileprivate|open|static|final|override|mutating|@\w+)\s+)*(?:func|class|struct|enum|protocol|extension)\s",
    ],
    functions: &[r"\bfunc\s+([A-Za-z_]\w*)"],
    classes: &[r"\b(?:class|struct|enum|protocol)\s+([A-Za-z_]\w*)"],
    imports: &[r"(?m)^\s*import\s+(\w+)"],
    exports: &[
        r"(?m)^\s*(?:public|open)\s+(?:final\s+)?(?:func|class|struct|enum|protocol)\s+([A-Za-z_]\w*)",
    ],
};

const GENERIC: PatternSpec = PatternSpec {
    boundary: &[r"^\s*(?:function|def|class|fn|func|sub|proc)\s"],
    functions: &[r"\b(?:function|def|fn|func|sub|proc)\s+([A-Za-z_]\w*)"],
    classes: &[r"\bclass\s+([A-Za-z_]\w*)"],
    imports: &[],
    exports: &[],
};

fn spec_for(language: &str) -> &'static PatternSpec {
    match language {
        "rust" => &RUST,
        "python" => &PYTHON,
        "javascript" | "typescript" => &JS_TS,
        "go" => &GO,
        "java" | "kotlin" | "csharp" | "scala" | "dart" => &JAVA_LIKE,
        "c" | "cpp" => &C_CPP,
        "ruby" => &RUBY,
        "php" => &PHP,
        "swift" => &SWIFT,
        _ => &GENERIC,
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("Skipping invalid code pattern {:?}: {}", p, e);
                None
            }
        })
        .collect()
}

const LANGUAGES: &[&str] = &[
    "rust", "python", "javascript", "typescript", "go", "java", "kotlin", "csharp", "scala",
    "dart", "c", "cpp", "ruby", "php", "swift", "generic",
];

static COMPILED: LazyLock<HashMap<&'static str, LanguagePatterns>> = LazyLock::new(|| {
    let build = |lang: &'static str| {
        let spec = spec_for(lang);
        let patterns = LanguagePatterns {
            boundary: compile(spec.boundary),
            functions: compile(spec.functions),
            classes: compile(spec.classes),
            imports: compile(spec.imports),
            exports: compile(spec.exports),
        };
        (lang, patterns)
    };
    LANGUAGES.iter().copied().map(build).collect()
});

fn patterns_for(language: &str) -> Option<&'static LanguagePatterns> {
    COMPILED.get(language).or_else(|| COMPILED.get("generic"))
}

/// Collect the first non-empty capture of each match, deduplicated in order.
fn capture_all(regexes: &[Regex], text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for re in regexes {
        for caps in re.captures_iter(text) {
            let name = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().trim())
                .find(|s| !s.is_empty());
            if let Some(name) = name {
                if !out.iter().any(|existing| existing == name) {
                    out.push(name.to_string());
                }
            }
        }
    }
    out
}

/// Extract symbols from a piece of code.
pub fn extract_code_context(text: &str, language: &str) -> CodeContext {
    let Some(patterns) = patterns_for(language) else {
        return CodeContext {
            language: Some(language.to_string()),
            ..Default::default()
        };
    };

    CodeContext {
        language: Some(language.to_string()),
        functions: capture_all(&patterns.functions, text),
        classes: capture_all(&patterns.classes, text),
        imports: capture_all(&patterns.imports, text),
        exports: capture_all(&patterns.exports, text),
    }
}

// ============================================================================
// Chunking
// ============================================================================

/// Split source code at declaration boundaries.
///
/// A new chunk starts at each boundary line, or when adding the next line
/// would push the chunk past `chunk_size * 4` characters. Each new chunk is
/// seeded with the last `overlap * 4` characters of the previous one,
/// snapped forward to a line start. Imports and exports are extracted from
/// the whole file; functions and classes per chunk.
pub fn chunk_code(text: &str, language: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let window = (chunk_size * CHARS_PER_TOKEN).max(1);
    let overlap_chars = overlap * CHARS_PER_TOKEN;
    let patterns = patterns_for(language);

    let file_context = extract_code_context(text, language);

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;
    let mut has_body = false;
    // a boundary right after another (attribute, decorator, doc comment) stays attached
    let mut prev_was_boundary = false;

    for line in text.split_inclusive('\n') {
        let line_chars = line.chars().count();
        let is_boundary = patterns
            .map(|p| p.boundary.iter().any(|re| re.is_match(line.trim_end())))
            .unwrap_or(false);

        let starts_unit = is_boundary && !prev_was_boundary;
        if has_body && (starts_unit || current_chars + line_chars > window) {
            let tail = overlap_tail(&current, overlap_chars);
            pieces.push(std::mem::take(&mut current));
            current_chars = tail.chars().count();
            current = tail;
            has_body = false;
        }

        current.push_str(line);
        current_chars += line_chars;
        if !line.trim().is_empty() {
            has_body = true;
            prev_was_boundary = is_boundary;
        }
    }

    if has_body {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .filter_map(|piece| {
            let text = piece.trim_start_matches(['\n', '\r']).trim_end();
            if text.trim().is_empty() {
                return None;
            }
            let local = extract_code_context(text, language);
            Some(Chunk {
                text: text.to_string(),
                heading: None,
                heading_level: None,
                code: Some(CodeContext {
                    language: Some(language.to_string()),
                    functions: local.functions,
                    classes: local.classes,
                    imports: file_context.imports.clone(),
                    exports: file_context.exports.clone(),
                }),
            })
        })
        .collect()
}

/// Last `max_chars` characters of `text`, starting at a line start.
fn overlap_tail(text: &str, max_chars: usize) -> String {
    if max_chars == 0 || text.is_empty() {
        return String::new();
    }

    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(total - max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    if text[..cut].ends_with('\n') {
        return text[cut..].to_string();
    }

    match text[cut..].find('\n') {
        Some(nl) => text[cut + nl + 1..].to_string(),
        None => String::new(),
    }
}
