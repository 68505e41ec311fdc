// 🧾 Audit fields shared by every persisted record

use crate::compare::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who created/modified a row and when.
///
/// Empty on candidates built from a snapshot; filled in by `db` on write.
/// Never part of any diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Audit {
    /// Stamp for a freshly written row.
    pub fn created(actor: &str, at: DateTime<Utc>) -> Self {
        Audit {
            created_by: Some(actor.to_string()),
            created_at: Some(at),
            modified_by: Some(actor.to_string()),
            modified_at: Some(at),
        }
    }

    /// Declared audit columns, in table order.
    pub const FIELDS: [&'static str; 4] = ["created_by", "created_at", "modified_by", "modified_at"];

    /// Audit values paired with their column names.
    pub fn values(&self) -> [(&'static str, FieldValue); 4] {
        [
            ("created_by", (&self.created_by).into()),
            ("created_at", (&self.created_at).into()),
            ("modified_by", (&self.modified_by).into()),
            ("modified_at", (&self.modified_at).into()),
        ]
    }
}
