//! Indexing progress events and cooperative abort.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-file progress reported by `RagEngine::add_documents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ProgressEvent {
    Parsing { file: String },
    Chunking { file: String },
    Embedding { file: String, done: usize, total: usize },
    Completed { file: String, chunks: usize },
    /// The file was skipped; the job continues.
    Error { file: String, message: String },
}

impl ProgressEvent {
    /// File the event refers to.
    pub fn file(&self) -> &str {
        match self {
            Self::Parsing { file }
            | Self::Chunking { file }
            | Self::Embedding { file, .. }
            | Self::Completed { file, .. }
            | Self::Error { file, .. } => file,
        }
    }
}

/// Sending half of a progress channel.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half of a progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create a progress channel.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event if anyone is listening. A dropped receiver is not an error.
pub(crate) fn emit(progress: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}

// ============================================================================
// AbortHandle
// ============================================================================

/// Cooperative cancel flag for an indexing job.
///
/// Checked between files and between embedding batches; in-flight requests
/// finish first. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the running job.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag at the start of a new job.
    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_handle_shared() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        clone.abort();
        assert!(handle.is_aborted());
        handle.reset();
        assert!(!clone.is_aborted());
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::Embedding {
            file: "a.md".into(),
            done: 5,
            total: 10,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "embedding");
        assert_eq!(json["done"], 5);
        assert_eq!(event.file(), "a.md");
    }

    #[test]
    fn test_emit_without_listener() {
        let (tx, rx) = progress_channel();
        drop(rx);
        emit(
            Some(&tx),
            ProgressEvent::Parsing {
                file: "x".into(),
            },
        );
        emit(
            None,
            ProgressEvent::Parsing {
                file: "x".into(),
            },
        );
    }
}
