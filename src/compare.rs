// 🔍 Field Comparator - field-by-field diff of two records of the same kind
//
// Every record kind publishes a static, ordered list of field descriptors.
// The comparator walks that list, so the compared field set never depends on
// which values happen to be set.

use crate::entities::Audit;
use crate::error::{Result, SyncError};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Null, ToSqlOutput, Value};
use rusqlite::ToSql;
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// FIELD VALUES
// ============================================================================

/// Scalar value of one record field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl From<&Option<String>> for FieldValue {
    fn from(value: &Option<String>) -> Self {
        value.clone().map_or(FieldValue::Null, FieldValue::Text)
    }
}

impl From<&Option<i64>> for FieldValue {
    fn from(value: &Option<i64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Integer)
    }
}

impl From<&Option<bool>> for FieldValue {
    fn from(value: &Option<bool>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Boolean)
    }
}

impl From<&Option<NaiveDate>> for FieldValue {
    fn from(value: &Option<NaiveDate>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Date)
    }
}

impl From<&Option<DateTime<Utc>>> for FieldValue {
    fn from(value: &Option<DateTime<Utc>>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Timestamp)
    }
}

/// Dates and timestamps are stored as TEXT, the same format the readers in `db` parse.
impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::from(Null),
            FieldValue::Text(text) => ToSqlOutput::from(text.as_str()),
            FieldValue::Integer(number) => ToSqlOutput::from(*number),
            FieldValue::Boolean(flag) => ToSqlOutput::from(*flag),
            FieldValue::Date(day) => {
                ToSqlOutput::Owned(Value::Text(day.format("%Y-%m-%d").to_string()))
            }
            FieldValue::Timestamp(at) => ToSqlOutput::Owned(Value::Text(at.to_rfc3339())),
        })
    }
}

// ============================================================================
// DIFF
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Field name → `{old, new}`, only for fields that differ.
pub type Diff = BTreeMap<&'static str, FieldChange>;

// ============================================================================
// RECORDS & DESCRIPTORS
// ============================================================================

/// Type-erased snapshot of a record: its kind plus every declared field in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: &'static str,
    pub fields: Vec<(&'static str, FieldValue)>,
}

/// One declared field of a record kind.
pub struct FieldDescriptor<T: 'static> {
    pub name: &'static str,
    pub get: fn(&T) -> FieldValue,
    /// Identifiers and foreign keys are never compared.
    pub excluded: bool,
}

/// Shared diff behaviour of every persisted record kind.
///
/// Audit columns are composed in front of the kind's own descriptors and are
/// always excluded from `diff`.
pub trait Comparable: Sized + 'static {
    /// Table the record kind lives in; doubles as the kind name.
    const KIND: &'static str;

    fn descriptors() -> &'static [FieldDescriptor<Self>];

    fn audit(&self) -> &Audit;

    /// Full declared field set, in table order.
    fn fields() -> Vec<&'static str> {
        Audit::FIELDS
            .into_iter()
            .chain(Self::descriptors().iter().map(|field| field.name))
            .collect()
    }

    /// Fields left out of `diff` by default.
    fn excluded_fields() -> Vec<&'static str> {
        Audit::FIELDS
            .into_iter()
            .chain(
                Self::descriptors()
                    .iter()
                    .filter(|field| field.excluded)
                    .map(|field| field.name),
            )
            .collect()
    }

    fn record(&self) -> Record {
        Record {
            kind: Self::KIND,
            fields: self
                .audit()
                .values()
                .into_iter()
                .chain(
                    Self::descriptors()
                        .iter()
                        .map(|field| (field.name, (field.get)(self))),
                )
                .collect(),
        }
    }

    /// Diff against `other`, `self` being the old side.
    fn diff(&self, other: &Self) -> Result<Diff> {
        compare(&self.record(), &other.record(), &Self::excluded_fields())
    }
}

/// Compare two records field by field, skipping `excluded`.
///
/// Fails with `SchemaMismatch` when the records do not declare the same fields.
pub fn compare(base: &Record, candidate: &Record, excluded: &[&str]) -> Result<Diff> {
    let same_shape = base.kind == candidate.kind
        && base.fields.len() == candidate.fields.len()
        && base
            .fields
            .iter()
            .zip(&candidate.fields)
            .all(|((left, _), (right, _))| left == right);

    if !same_shape {
        return Err(SyncError::SchemaMismatch {
            base: base.kind,
            candidate: candidate.kind,
        });
    }

    let mut diff = Diff::new();
    for ((name, old), (_, new)) in base.fields.iter().zip(&candidate.fields) {
        if excluded.contains(name) || old == new {
            continue;
        }
        diff.insert(
            *name,
            FieldChange {
                old: old.clone(),
                new: new.clone(),
            },
        );
    }

    Ok(diff)
}

// ============================================================================
// TESTS
// ============================================================================
