//! Shared domain types: file types, embedding modes, record metadata.

use chrono::{DateTime, Utc};
use ragvault_db::vector::StoredRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FileType
// ============================================================================

/// Detected document type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Code,
    Markdown,
    #[default]
    Text,
    Pdf,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EmbeddingMode
// ============================================================================

/// How the indexer picks an embedding model per file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingMode {
    /// Code model for code files, text model for everything else.
    #[default]
    Auto,
    /// Always the text model.
    ManualText,
    /// Always the code model.
    ManualCode,
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::ManualText => write!(f, "manual-text"),
            Self::ManualCode => write!(f, "manual-code"),
        }
    }
}

impl FromStr for EmbeddingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual-text" | "text" => Ok(Self::ManualText),
            "manual-code" | "code" => Ok(Self::ManualCode),
            _ => Err(format!(
                "Unknown embedding mode: '{}'. Use 'auto', 'manual-text', or 'manual-code'.",
                s
            )),
        }
    }
}

// ============================================================================
// RecordType
// ============================================================================

/// Origin of a stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    #[default]
    File,
    PinnedUser,
    PinnedAssistant,
    System,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::PinnedUser => "pinned_user",
            Self::PinnedAssistant => "pinned_assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "file" => Ok(Self::File),
            "pinned_user" | "user" => Ok(Self::PinnedUser),
            "pinned_assistant" | "assistant" => Ok(Self::PinnedAssistant),
            "system" => Ok(Self::System),
            _ => Err(format!(
                "Unknown record type: '{}'. Use 'pinned_user', 'pinned_assistant', or 'system'.",
                s
            )),
        }
    }
}

// ============================================================================
// RecordMetadata
// ============================================================================

/// Structural metadata extracted from a code chunk.
///
/// Always present on records; empty lists when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeContext {
    pub language: Option<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

impl CodeContext {
    /// Whether no symbol was extracted.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.classes.is_empty()
            && self.imports.is_empty()
            && self.exports.is_empty()
    }
}

/// Metadata stored with every record.
///
/// Serialized as the record's JSON payload. Every field is always present so
/// consumers never have to probe for optional keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordMetadata {
    pub record_type: RecordType,
    /// Human-facing origin (file path or pin source).
    pub source: String,
    pub priority: i32,
    /// Added to the similarity score at ranking time.
    pub score_boost: f32,
    pub indexed_at: DateTime<Utc>,
    pub pinned_at: Option<DateTime<Utc>>,
    pub message_id: Option<String>,
    pub tags: Vec<String>,
    pub embedding_model: String,
    pub file_type: FileType,
    pub heading: Option<String>,
    pub heading_level: Option<u8>,
    pub chunk_index: usize,
    pub code_context: CodeContext,
}

// ============================================================================
// IndexRecord
// ============================================================================

/// A chunk with its vector and metadata, as written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub file_path: String,
    pub metadata: RecordMetadata,
}

impl IndexRecord {
    /// Convert to the storage representation.
    pub fn to_stored(&self) -> Result<StoredRecord, serde_json::Error> {
        let payload = serde_json::to_value(&self.metadata)?;
        let mut record = StoredRecord::new(
            self.id.clone(),
            self.vector.clone(),
            self.text.clone(),
            self.file_path.clone(),
        )
        .with_record_type(self.metadata.record_type.as_str())
        .with_payload(payload);

        if let Some(message_id) = &self.metadata.message_id {
            record = record.with_message_id(message_id.clone());
        }
        Ok(record)
    }

    /// Rebuild from storage. Unreadable payloads fall back to defaults.
    pub fn from_stored(record: StoredRecord) -> Self {
        let metadata = serde_json::from_value::<RecordMetadata>(record.payload.clone())
            .unwrap_or_else(|_| RecordMetadata {
                source: record.file_path.clone(),
                ..Default::default()
            });

        Self {
            id: record.id,
            vector: record.vector,
            text: record.text,
            file_path: record.file_path,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_mode_parse() {
        assert_eq!("auto".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Auto);
        assert_eq!(
            "manual-code".parse::<EmbeddingMode>().unwrap(),
            EmbeddingMode::ManualCode
        );
        assert_eq!(
            "TEXT".parse::<EmbeddingMode>().unwrap(),
            EmbeddingMode::ManualText
        );
        assert!("both".parse::<EmbeddingMode>().is_err());
    }

    #[test]
    fn test_embedding_mode_yaml_spelling() {
        let mode: EmbeddingMode = serde_yaml::from_str("manual-text").unwrap();
        assert_eq!(mode, EmbeddingMode::ManualText);
    }

    #[test]
    fn test_metadata_payload_keeps_empty_tags() {
        let record = IndexRecord {
            id: "r1".into(),
            vector: vec![0.1, 0.2],
            text: "hello".into(),
            file_path: "notes.md".into(),
            metadata: RecordMetadata {
                source: "notes.md".into(),
                message_id: Some("m-1".into()),
                record_type: RecordType::PinnedUser,
                ..Default::default()
            },
        };

        let stored = record.to_stored().unwrap();
        assert_eq!(stored.record_type, "pinned_user");
        assert_eq!(stored.message_id.as_deref(), Some("m-1"));
        assert!(stored.payload["tags"].as_array().unwrap().is_empty());
        assert!(stored.payload["codeContext"]["functions"].is_array());

        let back = IndexRecord::from_stored(stored);
        assert_eq!(back, record);
    }

    #[test]
    fn test_from_stored_tolerates_foreign_payload() {
        let stored = StoredRecord::new("x", vec![1.0], "t", "a.txt")
            .with_payload(serde_json::json!("not an object"));
        let record = IndexRecord::from_stored(stored);
        assert_eq!(record.metadata.source, "a.txt");
        assert_eq!(record.metadata.record_type, RecordType::File);
    }
}
