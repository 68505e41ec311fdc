// 📅 UnitChange - one dated change-log note
//
// Natural key inside a unit is the day alone; several notes may share a day.

use super::Audit;
use crate::compare::{Comparable, FieldDescriptor};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitChange {
    pub id: Option<i64>,
    pub unit_id: Option<i64>,
    pub day: Option<NaiveDate>,
    pub description: Option<String>,
    pub audit: Audit,
}

static UNIT_CHANGE_FIELDS: [FieldDescriptor<UnitChange>; 4] = [
    FieldDescriptor {
        name: "id",
        get: |change| (&change.id).into(),
        excluded: true,
    },
    FieldDescriptor {
        name: "unit_id",
        get: |change| (&change.unit_id).into(),
        excluded: true,
    },
    FieldDescriptor {
        name: "day",
        get: |change| (&change.day).into(),
        excluded: false,
    },
    FieldDescriptor {
        name: "description",
        get: |change| (&change.description).into(),
        excluded: false,
    },
];

impl Comparable for UnitChange {
    const KIND: &'static str = "unit_changes";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &UNIT_CHANGE_FIELDS
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }
}

impl UnitChange {
    pub fn new(day: NaiveDate, description: impl Into<String>) -> Self {
        UnitChange {
            day: Some(day),
            description: Some(description.into()),
            ..UnitChange::default()
        }
    }

    /// Copy of this note attached to another unit, ready to be inserted.
    pub fn reparented(&self, unit_id: i64) -> UnitChange {
        UnitChange {
            id: None,
            unit_id: Some(unit_id),
            audit: Audit::default(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::FieldValue;

    #[test]
    fn test_new_change_against_empty_record() {
        let day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let change = UnitChange::new(day, "Change 1");

        let diff = UnitChange::default().diff(&change).unwrap();

        assert_eq!(diff.len(), 2);
        assert_eq!(diff["day"].old, FieldValue::Null);
        assert_eq!(diff["day"].new, FieldValue::Date(day));
        assert_eq!(diff["description"].new, FieldValue::Text("Change 1".to_string()));
    }

    #[test]
    fn test_declared_fields() {
        assert_eq!(
            &UnitChange::fields()[4..],
            &["id", "unit_id", "day", "description"]
        );
    }
}
