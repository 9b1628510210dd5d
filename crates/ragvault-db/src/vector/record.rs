//! Stored record type and delete filters.

use serde::{Deserialize, Serialize};

// ============================================================================
// StoredRecord
// ============================================================================

/// A row in the vector store.
///
/// The storage layer only knows the columns it filters on. Everything else the
/// retrieval pipeline attaches to a chunk travels in the JSON `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Unique identifier for this row.
    pub id: String,

    /// The embedding vector.
    #[serde(default)]
    pub vector: Vec<f32>,

    /// Chunk text.
    pub text: String,

    /// Source file path or logical key.
    pub file_path: String,

    /// Record type ("file", "pinned_user", ...).
    pub record_type: String,

    /// Originating message id for pinned records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// JSON payload with the remaining metadata.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl StoredRecord {
    /// Create a new record with required fields.
    pub fn new(
        id: impl Into<String>,
        vector: Vec<f32>,
        text: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            vector,
            text: text.into(),
            file_path: file_path.into(),
            record_type: RECORD_TYPE_FILE.to_string(),
            message_id: None,
            payload: serde_json::Value::Object(Default::default()),
        }
    }

    /// Set the record type.
    pub fn with_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = record_type.into();
        self
    }

    /// Set the message id.
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Record type for chunks of indexed files.
pub const RECORD_TYPE_FILE: &str = "file";

// ============================================================================
// RecordFilter
// ============================================================================

/// Filter criteria for deleting records.
///
/// All fields are optional and combined with AND logic. An empty filter
/// matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    /// Match by record id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Match by exact file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// Match by message id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Match by record type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

impl RecordFilter {
    /// Create an empty filter (matches all).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by record id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Filter by file path.
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Filter by message id.
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Filter by record type.
    pub fn with_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Check if the filter is empty (matches all).
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.file_path.is_none()
            && self.message_id.is_none()
            && self.record_type.is_none()
    }

    /// Check whether a record satisfies every condition of the filter.
    pub fn matches(&self, record: &StoredRecord) -> bool {
        if let Some(ref id) = self.id {
            if &record.id != id {
                return false;
            }
        }

        if let Some(ref path) = self.file_path {
            if &record.file_path != path {
                return false;
            }
        }

        if let Some(ref message_id) = self.message_id {
            match &record.message_id {
                Some(m) if m == message_id => {}
                _ => return false,
            }
        }

        if let Some(ref record_type) = self.record_type {
            if &record.record_type != record_type {
                return false;
            }
        }

        true
    }

    /// Build a SQL-like WHERE clause for LanceDB.
    ///
    /// Returns `None` if the filter is empty.
    pub fn to_lance_filter(&self) -> Option<String> {
        let mut conditions: Vec<String> = Vec::new();

        if let Some(id) = &self.id {
            conditions.push(format!("id = '{}'", escape_sql_string(id)));
        }

        if let Some(path) = &self.file_path {
            conditions.push(format!("file_path = '{}'", escape_sql_string(path)));
        }

        if let Some(message_id) = &self.message_id {
            conditions.push(format!("message_id = '{}'", escape_sql_string(message_id)));
        }

        if let Some(record_type) = &self.record_type {
            conditions.push(format!(
                "record_type = '{}'",
                escape_sql_string(record_type)
            ));
        }

        if conditions.is_empty() {
            None
        } else {
            Some(conditions.join(" AND "))
        }
    }
}

/// Escape single quotes in SQL strings.
fn escape_sql_string(s: &str) -> String {
    s.replace('\'', "''")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StoredRecord {
        StoredRecord::new("r1", vec![1.0, 0.0], "hello", "docs/a.md")
            .with_record_type("pinned_user")
            .with_message_id("msg-1")
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = RecordFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&record()));
        assert!(filter.to_lance_filter().is_none());
    }

    #[test]
    fn test_filter_matching() {
        let r = record();
        assert!(RecordFilter::new().with_message_id("msg-1").matches(&r));
        assert!(!RecordFilter::new().with_message_id("msg-2").matches(&r));
        assert!(RecordFilter::new()
            .with_file_path("docs/a.md")
            .with_record_type("pinned_user")
            .matches(&r));
        assert!(!RecordFilter::new().with_record_type("file").matches(&r));

        let plain = StoredRecord::new("r2", vec![], "x", "b.txt");
        assert!(!RecordFilter::new().with_message_id("msg-1").matches(&plain));
    }

    #[test]
    fn test_filter_to_lance_escapes_quotes() {
        let filter = RecordFilter::new()
            .with_file_path("it's.md")
            .with_record_type("file");
        let clause = filter.to_lance_filter().unwrap();
        assert!(clause.contains("file_path = 'it''s.md'"));
        assert!(clause.contains(" AND record_type = 'file'"));
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["filePath"], "docs/a.md");
        assert_eq!(json["recordType"], "pinned_user");
        assert_eq!(json["messageId"], "msg-1");
    }
}
