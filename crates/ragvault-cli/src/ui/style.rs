//! Message styling for CLI output.
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |
//! | `[skip]` | Skipped | Dim |

use owo_colors::OwoColorize;

use super::color::ColorMode;

/// Kind of status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ok,
    Err,
    /// Done, with caveats (skipped files, an aborted job)
    Warn,
    Info,
    /// Next step the user can take
    Hint,
    /// A file or record left out on purpose
    Skip,
}

impl MessageType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
            Self::Skip => "[skip]",
        }
    }

    fn paint(&self, prefix: &str) -> String {
        match self {
            Self::Ok => prefix.green().to_string(),
            Self::Err => prefix.red().to_string(),
            Self::Warn => prefix.yellow().to_string(),
            Self::Info => prefix.blue().to_string(),
            Self::Hint => prefix.cyan().to_string(),
            Self::Skip => prefix.dimmed().to_string(),
        }
    }
}

/// Formats fragments of human-readable output.
///
/// With colors off every method returns plain text; the CLI integration
/// tests match against that.
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    fn paint(&self, text: &str, paint: impl Fn(&str) -> String) -> String {
        if self.colors_enabled() {
            paint(text)
        } else {
            text.to_string()
        }
    }

    /// `[ok] text`, `[err] text`, ...
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = self.paint(msg_type.prefix(), |p| msg_type.paint(p));
        format!("{} {}", prefix, text)
    }

    /// Detail line aligned under the text of a message.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    pub fn section(&self, title: &str) -> String {
        self.paint(title, |t| t.bold().to_string())
    }

    /// `[err]` line, then indented `Cause:` and `Hint:` lines when given.
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut lines = vec![self.message(MessageType::Err, msg)];
        lines.extend(cause.map(|c| format!("      Cause: {}", c)));
        lines.extend(hint.map(|h| format!("      Hint: {}", h)));
        lines.join("\n")
    }

    /// `  + item` (green) or `  - item` (red).
    pub fn list_item(&self, prefix: &str, text: &str) -> String {
        let marker = match prefix {
            "+" => self.paint(prefix, |p| p.green().to_string()),
            "-" => self.paint(prefix, |p| p.red().to_string()),
            _ => prefix.to_string(),
        };
        format!("  {} {}", marker, text)
    }

    pub fn key_value(&self, key: &str, value: &str) -> String {
        format!("{}: {}", self.paint(key, |k| k.dimmed().to_string()), value)
    }

    pub fn snapshot_name(&self, name: &str) -> String {
        self.paint(name, |n| n.yellow().to_string())
    }

    pub fn file_path(&self, path: &str) -> String {
        self.paint(path, |p| p.cyan().to_string())
    }

    /// Two decimals. Green from 0.8, yellow from 0.5, red below.
    pub fn score(&self, value: f32) -> String {
        self.paint(&format!("{:.2}", value), |s| {
            if value >= 0.8 {
                s.green().to_string()
            } else if value >= 0.5 {
                s.yellow().to_string()
            } else {
                s.red().to_string()
            }
        })
    }

    /// Dim `[label]`, e.g. `[code]` or `[pinned_user]`.
    pub fn tag(&self, label: &str) -> String {
        self.paint(&format!("[{}]", label), |t| t.dimmed().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Style {
        Style::new(ColorMode::Never)
    }

    #[test]
    fn test_plain_messages() {
        let style = plain();
        assert_eq!(style.message(MessageType::Ok, "Indexed"), "[ok] Indexed");
        assert_eq!(style.message(MessageType::Skip, "b.bin"), "[skip] b.bin");
        assert_eq!(plain().message_detail("Chunks", "42"), "     Chunks: 42");
    }

    #[test]
    fn test_colored_prefix_keeps_text() {
        let style = Style::new(ColorMode::Always);
        if style.colors_enabled() {
            let line = style.message(MessageType::Warn, "Indexing aborted");
            assert!(line.contains("\u{1b}["));
            assert!(line.ends_with(" Indexing aborted"));
        }
    }

    #[test]
    fn test_error_with_context() {
        let output = plain().error_with_context(
            "Failed to load snapshot",
            Some("model not installed"),
            Some("Pull the model first"),
        );
        assert_eq!(
            output,
            "[err] Failed to load snapshot\n      Cause: model not installed\n      Hint: Pull the model first"
        );
        assert_eq!(plain().error_with_context("Boom", None, None), "[err] Boom");
        assert_eq!(
            plain().error_with_context("Boom", None, Some("retry")),
            "[err] Boom\n      Hint: retry"
        );
    }

    #[test]
    fn test_plain_fragments() {
        let style = plain();
        assert_eq!(style.list_item("+", "docs/a.md"), "  + docs/a.md");
        assert_eq!(style.list_item("-", "bad.bin"), "  - bad.bin");
        assert_eq!(style.key_value("Backend", "simple"), "Backend: simple");
        assert_eq!(style.snapshot_name("nightly"), "nightly");
        assert_eq!(style.score(0.8567), "0.86");
        assert_eq!(style.tag("code"), "[code]");
    }
}
