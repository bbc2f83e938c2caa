//! Change-tracking collaborator surface.
//!
//! The pipeline never decides *which* rows are dirty; it consumes pending
//! entry descriptors through [`TrackedEntry`] and reads their before/after
//! images by column name.

use crate::{
    model::{EntityModel, ForeignKeyModel, KeyShape},
    value::{KeyValue, Value, ValueSource},
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

///
/// EntryState
///
/// Pending mutation kind. Variant order is the deterministic in-wave rank:
/// deletions of now-irrelevant rows are visible first in generated scripts.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum EntryState {
    Deleted,
    Modified,
    Added,
}

impl EntryState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deleted => "Deleted",
            Self::Modified => "Modified",
            Self::Added => "Added",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// EntryRef
///
/// Diagnostic label for one tracked entry: entity name plus a best-effort
/// key snapshot. Carried by conflict and failure reports so callers can
/// attribute errors to rows without holding the entries themselves.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntryRef {
    pub entity: String,
    pub key: Option<KeyValue>,
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{key}]", self.entity),
            None => write!(f, "{}[?]", self.entity),
        }
    }
}

///
/// TrackedEntry
///
/// One pending row-level mutation as exposed by change tracking. The
/// provided key-snapshot methods derive principal/dependent key values from
/// the model's column lists; collaborators whose key values are not literal
/// column values may override them.
///

pub trait TrackedEntry {
    fn model(&self) -> &Arc<EntityModel>;

    fn state(&self) -> EntryState;

    /// After-image value of a column, if this entry maps it.
    fn current_value(&self, column: &str) -> Option<Value>;

    /// Before-image value of a column, if this entry maps it.
    fn original_value(&self, column: &str) -> Option<Value>;

    /// Whether a literal write is pending for a column (Modified entries).
    fn is_modified(&self, column: &str) -> bool;

    /// Build a key snapshot over `columns`, honoring the sentinel rule:
    /// a missing or `Value::None` component makes the snapshot invalid and
    /// the result is `None`.
    fn key_snapshot(
        &self,
        columns: &[String],
        shape: KeyShape,
        source: ValueSource,
    ) -> Option<KeyValue> {
        let read = |column: &str| match source {
            ValueSource::Current => self.current_value(column),
            ValueSource::Original => self.original_value(column),
        };

        let snapshot = match shape {
            KeyShape::Scalar => KeyValue::Scalar(read(columns.first()?)?),
            KeyShape::Composite => {
                let mut values = Vec::with_capacity(columns.len());
                for column in columns {
                    values.push(read(column)?);
                }
                KeyValue::Composite(values)
            }
            KeyShape::Bytes => match read(columns.first()?)? {
                Value::Blob(bytes) => KeyValue::Bytes(bytes),
                _ => return None,
            },
        };

        snapshot.is_valid().then_some(snapshot)
    }

    /// Candidate-key snapshot on the principal side of `fk`.
    fn principal_key(&self, fk: &ForeignKeyModel, source: ValueSource) -> Option<KeyValue> {
        self.key_snapshot(&fk.principal_columns, fk.key_shape, source)
    }

    /// Foreign-key snapshot on the dependent side of `fk`.
    fn dependent_key(&self, fk: &ForeignKeyModel, source: ValueSource) -> Option<KeyValue> {
        self.key_snapshot(&fk.dependent_columns, fk.key_shape, source)
    }

    /// Primary-key snapshot for row identity.
    fn primary_key(&self, source: ValueSource) -> Option<KeyValue> {
        let model = self.model();

        self.key_snapshot(&model.primary_key, model.primary_key_shape(), source)
    }

    /// Diagnostic reference for reports. Falls back to the before-image key
    /// when the after-image key is not materialized yet.
    fn entry_ref(&self) -> EntryRef {
        let source = if self.state() == EntryState::Deleted {
            ValueSource::Original
        } else {
            ValueSource::Current
        };
        let key = self
            .primary_key(source)
            .or_else(|| self.primary_key(ValueSource::Original));

        EntryRef {
            entity: self.model().entity_name.clone(),
            key,
        }
    }
}
