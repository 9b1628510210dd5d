//! Progress indicators for long-running CLI operations.
//!
//! Indexing progress is driven by [`ProgressEvent`]s from the core channel;
//! snapshot operations use a plain spinner. Everything is hidden when stdout
//! is not a TTY, with `--quiet`, and with `--json`.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ragvault_core::{ProgressEvent, ProgressReceiver};
use tokio::task::JoinHandle;

/// Progress feedback mode based on output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: animated spinners and bars
    Interactive,
    /// Non-TTY or `--quiet`: final results only
    Quiet,
    /// `--json`: nothing but the JSON document
    Silent,
}

impl ProgressMode {
    pub fn detect(quiet: bool, json: bool) -> Self {
        if json {
            Self::Silent
        } else if quiet || !std::io::stdout().is_terminal() {
            Self::Quiet
        } else {
            Self::Interactive
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const BAR_CHARS: &str = "█░";

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS)
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{bar:20.cyan/dim}] {pos}/{len} files {msg} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(BAR_CHARS)
}

/// Spinner for operations with no natural unit of progress.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(spinner_style());
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// File-level progress bar for `ragvault index`.
///
/// Cloning shares the underlying bar, so one clone can live in the listener
/// task while the command awaits the indexing job.
#[derive(Clone)]
pub struct IndexProgress {
    bar: ProgressBar,
}

impl IndexProgress {
    pub fn new(total_files: u64, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new(total_files);
            pb.set_style(bar_style());
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Apply one event. Completed and failed files both advance the bar.
    pub fn apply(&self, event: &ProgressEvent) {
        let name = display_name(event.file());
        match event {
            ProgressEvent::Parsing { .. } => self.bar.set_message(format!("parsing {}", name)),
            ProgressEvent::Chunking { .. } => self.bar.set_message(format!("chunking {}", name)),
            ProgressEvent::Embedding { done, total, .. } => self
                .bar
                .set_message(format!("embedding {} ({}/{})", name, done, total)),
            ProgressEvent::Completed { .. } | ProgressEvent::Error { .. } => self.bar.inc(1),
        }
    }

    /// Consume events until the engine drops its sender.
    pub fn listen(&self, mut rx: ProgressReceiver) -> JoinHandle<()> {
        let progress = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                tracing::trace!(?event, "progress");
                progress.apply(&event);
            }
        })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// File name only; the full path is in the final report.
fn display_name(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_is_silent() {
        assert_eq!(ProgressMode::detect(false, true), ProgressMode::Silent);
        assert_eq!(ProgressMode::detect(true, true), ProgressMode::Silent);
        assert_eq!(ProgressMode::detect(true, false), ProgressMode::Quiet);
    }

    #[test]
    fn test_finished_files_advance_bar() {
        let progress = IndexProgress::new(3, ProgressMode::Quiet);
        progress.apply(&ProgressEvent::Parsing {
            file: "docs/a.md".into(),
        });
        progress.apply(&ProgressEvent::Completed {
            file: "docs/a.md".into(),
            chunks: 4,
        });
        progress.apply(&ProgressEvent::Error {
            file: "docs/b.bin".into(),
            message: "not UTF-8".into(),
        });
        assert_eq!(progress.position(), 2);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("docs/guide/install.md"), "install.md");
        assert_eq!(display_name(""), "");
    }

    #[tokio::test]
    async fn test_listener_drains_channel() {
        let progress = IndexProgress::new(2, ProgressMode::Quiet);
        let (tx, rx) = ragvault_core::progress_channel();
        let handle = progress.listen(rx);

        for file in ["a.md", "b.md"] {
            tx.send(ProgressEvent::Completed {
                file: file.into(),
                chunks: 1,
            })
            .expect("send");
        }
        drop(tx);

        handle.await.expect("listener");
        assert_eq!(progress.position(), 2);
    }
}
