//! Runtime model surface supplied by the metadata collaborator.
//!
//! Models are plain values constructed by the caller and shared via `Arc`
//! for the duration of a save operation. Foreign keys reference entities by
//! name, never by object reference, so the model graph is acyclic even when
//! the schema is not.

use serde::{Deserialize, Serialize};
use std::fmt;

///
/// TableIdent
/// Target resource of a command: table name plus optional schema.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TableIdent {
    pub schema: Option<String>,
    pub name: String,
}

impl TableIdent {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

///
/// ValueGeneration
/// Store-side generation strategy for one column; decides read-back
/// participation in column modifications.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum ValueGeneration {
    #[default]
    Never,
    OnAdd,
    OnAddOrUpdate,
}

///
/// ColumnModel
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ColumnModel {
    pub name: String,
    pub is_key: bool,
    pub generation: ValueGeneration,
}

impl ColumnModel {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_key: false,
            generation: ValueGeneration::Never,
        }
    }

    #[must_use]
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_key: true,
            generation: ValueGeneration::Never,
        }
    }

    #[must_use]
    pub fn generated(name: impl Into<String>, generation: ValueGeneration) -> Self {
        Self {
            name: name.into(),
            is_key: false,
            generation,
        }
    }
}

///
/// KeyShape
/// Closed set of supported key representations, fixed per foreign key at
/// model-build time.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum KeyShape {
    Scalar,
    Composite,
    Bytes,
}

///
/// ForeignKeyModel
/// One relationship: the dependent (referencing) side holds the foreign-key
/// columns, the principal (referenced) side holds the candidate key.
/// Identity is structural; the name doubles as the diagnostic label.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ForeignKeyModel {
    pub name: String,
    pub principal_entity: String,
    pub principal_columns: Vec<String>,
    pub dependent_entity: String,
    pub dependent_columns: Vec<String>,
    pub key_shape: KeyShape,
}

impl ForeignKeyModel {
    /// Scalar single-column relationship, the common case.
    #[must_use]
    pub fn scalar(
        name: impl Into<String>,
        principal_entity: impl Into<String>,
        principal_column: impl Into<String>,
        dependent_entity: impl Into<String>,
        dependent_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            principal_entity: principal_entity.into(),
            principal_columns: vec![principal_column.into()],
            dependent_entity: dependent_entity.into(),
            dependent_columns: vec![dependent_column.into()],
            key_shape: KeyShape::Scalar,
        }
    }
}

///
/// EntityModel
/// Minimal runtime model for one entity: table identity, columns, and the
/// foreign keys on both sides. `foreign_keys` lists relationships where the
/// entity is the dependent; `referencing_keys` those where it is the
/// principal.
///

#[derive(Clone, Debug)]
pub struct EntityModel {
    pub entity_name: String,
    pub table: TableIdent,
    pub columns: Vec<ColumnModel>,
    /// Primary key column names, in key order.
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<std::sync::Arc<ForeignKeyModel>>,
    pub referencing_keys: Vec<std::sync::Arc<ForeignKeyModel>>,
}

impl EntityModel {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnModel> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Key shape implied by the primary-key column count.
    #[must_use]
    pub fn primary_key_shape(&self) -> KeyShape {
        if self.primary_key.len() == 1 {
            KeyShape::Scalar
        } else {
            KeyShape::Composite
        }
    }
}
