// 🛡️ Unit Entity - aggregate root, matched by name
//
// Display metadata lives here and is updated in place. Stats live in
// UnitVersion records, history in UnitChange records.

use super::{Audit, UnitChange, UnitVersion};
use crate::compare::{Comparable, FieldDescriptor};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Row id, `None` until persisted
    pub id: Option<i64>,

    /// Natural key
    pub name: Option<String>,

    pub wiki_path: Option<String>,
    pub image_url: Option<String>,
    pub panel_url: Option<String>,

    pub audit: Audit,

    /// Newest first; `versions[0]` is the latest
    pub versions: Vec<UnitVersion>,

    /// Newest day first
    pub changes: Vec<UnitChange>,
}

static UNIT_FIELDS: [FieldDescriptor<Unit>; 5] = [
    FieldDescriptor {
        name: "id",
        get: |unit| (&unit.id).into(),
        excluded: true,
    },
    FieldDescriptor {
        name: "name",
        get: |unit| (&unit.name).into(),
        excluded: false,
    },
    FieldDescriptor {
        name: "wiki_path",
        get: |unit| (&unit.wiki_path).into(),
        excluded: false,
    },
    FieldDescriptor {
        name: "image_url",
        get: |unit| (&unit.image_url).into(),
        excluded: false,
    },
    FieldDescriptor {
        name: "panel_url",
        get: |unit| (&unit.panel_url).into(),
        excluded: false,
    },
];

impl Comparable for Unit {
    const KIND: &'static str = "units";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &UNIT_FIELDS
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }
}

impl Unit {
    pub fn named(name: impl Into<String>) -> Self {
        Unit {
            name: Some(name.into()),
            ..Unit::default()
        }
    }

    /// Latest version by insertion order
    pub fn latest_version(&self) -> Option<&UnitVersion> {
        self.versions.first()
    }

    /// Days already present in the change log
    pub fn change_days(&self) -> Vec<Option<NaiveDate>> {
        self.changes.iter().map(|change| change.day).collect()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        write!(f, "{} - {}", id, self.name.as_deref().unwrap_or("<unnamed>"))
    }
}
