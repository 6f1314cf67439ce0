//! Numbers computed for sibling entities, readable through `KPI_FIELD(entity_id, field_key)`.

use crate::model::{FieldDef, FieldKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type EntityId = i64;

/// Serialized form of one snapshot entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossEntityValue {
    pub entity_id: EntityId,
    pub field_key: String,
    pub value: f64,
}

/// Immutable `(entity, field key) -> number` lookup. Misses read as `0.0`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CrossEntityValue>", into = "Vec<CrossEntityValue>")]
pub struct CrossEntitySnapshot {
    values: HashMap<(EntityId, String), f64>,
}

/// Stored numbers of one sibling entity, as loaded by the entry store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SiblingEntry {
    pub entity_id: EntityId,
    pub fields: Vec<FieldDef>,
    /// Stored numeric column per field key (formula fields hold their persisted result).
    #[serde(default)]
    pub numbers: HashMap<String, Option<f64>>,
}

impl CrossEntitySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(
        mut self,
        entity_id: EntityId,
        field_key: impl Into<String>,
        value: f64,
    ) -> Self {
        self.insert(entity_id, field_key, value);
        self
    }

    pub fn insert(&mut self, entity_id: EntityId, field_key: impl Into<String>, value: f64) {
        self.values.insert((entity_id, field_key.into()), value);
    }

    /// Build the snapshot for `current` from its siblings in the same tenant and period.
    ///
    /// Only number and formula fields with a stored value contribute, and `current` itself is
    /// always left out so an entity cannot read its own previous results.
    pub fn from_siblings<'a>(
        current: EntityId,
        siblings: impl IntoIterator<Item = &'a SiblingEntry>,
    ) -> Self {
        let mut snapshot = Self::new();
        for sibling in siblings {
            if sibling.entity_id == current {
                continue;
            }
            for field in &sibling.fields {
                if !matches!(field.kind, FieldKind::Number | FieldKind::Formula { .. }) {
                    continue;
                }
                if let Some(Some(value)) = sibling.numbers.get(&field.key) {
                    snapshot.insert(sibling.entity_id, field.key.clone(), *value);
                }
            }
        }
        log::trace!(
            "cross-entity snapshot for entity {current}: {} values",
            snapshot.len()
        );
        snapshot
    }

    /// Exact lookup, `None` on a miss.
    pub fn lookup(&self, entity_id: EntityId, field_key: &str) -> Option<f64> {
        self.values
            .get(&(entity_id, field_key.to_string()))
            .copied()
    }

    /// Total lookup used by `KPI_FIELD`: a miss is `0.0`.
    pub fn get(&self, entity_id: EntityId, field_key: &str) -> f64 {
        self.lookup(entity_id, field_key).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<CrossEntityValue>> for CrossEntitySnapshot {
    fn from(entries: Vec<CrossEntityValue>) -> Self {
        entries.into_iter().fold(Self::new(), |snapshot, entry| {
            snapshot.with_value(entry.entity_id, entry.field_key, entry.value)
        })
    }
}

impl From<CrossEntitySnapshot> for Vec<CrossEntityValue> {
    fn from(snapshot: CrossEntitySnapshot) -> Self {
        let mut out: Vec<CrossEntityValue> = snapshot
            .values
            .into_iter()
            .map(|((entity_id, field_key), value)| CrossEntityValue {
                entity_id,
                field_key,
                value,
            })
            .collect();
        out.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then_with(|| a.field_key.cmp(&b.field_key))
        });
        out
    }
}
