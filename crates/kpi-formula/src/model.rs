use crate::value::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One row of a multi-line items field: sub-field key to raw cell.
pub type ItemRow = BTreeMap<String, CellValue>;

/// Field kinds as declared on an entity. `Text`, `Date` and `Boolean` are never visible to
/// formulas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Number,
    Text,
    Date,
    Boolean,
    Items {
        /// Sub-field keys declared in the schema. They are usable as column identifiers even
        /// when no row carries them.
        #[serde(default)]
        sub_fields: Vec<String>,
    },
    Formula {
        expression: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub key: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn number(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FieldKind::Number,
        }
    }

    pub fn text(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn items(key: impl Into<String>, sub_fields: Vec<impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            kind: FieldKind::Items {
                sub_fields: sub_fields.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn formula(key: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FieldKind::Formula {
                expression: expression.into(),
            },
        }
    }

    pub fn expression(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Formula { expression } => Some(expression),
            _ => None,
        }
    }
}

/// Stored values for one entity. Formula fields never appear here; they are computed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryValues {
    pub scalars: HashMap<String, Option<f64>>,
    pub lists: HashMap<String, Vec<ItemRow>>,
}

impl EntryValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number(self, key: impl Into<String>, value: f64) -> Self {
        self.with_scalar(key, Some(value))
    }

    pub fn with_scalar(mut self, key: impl Into<String>, value: Option<f64>) -> Self {
        self.scalars.insert(key.into(), value);
        self
    }

    pub fn with_list(mut self, key: impl Into<String>, rows: Vec<ItemRow>) -> Self {
        self.lists.insert(key.into(), rows);
        self
    }

    /// `None` both for an unset key and for a key explicitly stored as null.
    pub fn scalar(&self, key: &str) -> Option<f64> {
        self.scalars.get(key).copied().flatten()
    }

    pub fn list(&self, key: &str) -> &[ItemRow] {
        self.lists.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}
