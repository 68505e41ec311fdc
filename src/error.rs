// 🚨 Error kinds for loading, comparing and persisting units

use std::path::PathBuf;

/// Everything that can go wrong while syncing a snapshot.
///
/// `FileNotFound` and `MalformedInput` are recovered by the command layer and
/// reported as `{"message": ...}` payloads. `Storage` aborts the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("File doesn't exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid format: {0}")]
    MalformedInput(String),

    #[error("cannot compare a `{base}` record with a `{candidate}` record")]
    SchemaMismatch {
        base: &'static str,
        candidate: &'static str,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to encode audit data: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Short message used in the structured payload (no paths or parser detail).
    pub fn message(&self) -> String {
        match self {
            SyncError::FileNotFound(_) => "File doesn't exist".to_string(),
            SyncError::MalformedInput(_) => "Invalid format".to_string(),
            other => other.to_string(),
        }
    }

    /// Structured, non-throwing form handed back to callers.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({ "message": self.message() })
    }

    /// True for failures coming from the persistence engine.
    pub fn is_storage(&self) -> bool {
        matches!(self, SyncError::Storage(_) | SyncError::Encode(_))
    }
}
