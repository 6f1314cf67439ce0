//! Evaluates an entity's formula fields in declaration order.
//!
//! The namespace grows as fields are visited: number fields and list fields are registered when
//! reached, and each successful formula result is bound under its field key for the formulas
//! after it. A formula can therefore only see fields declared before it; a forward reference
//! is an undefined name.

use crate::config::EvaluatorConfig;
use crate::cross_entity::{CrossEntitySnapshot, EntityId, SiblingEntry};
use crate::engine::{check_expression, FormulaError};
use crate::model::{EntryValues, FieldDef, FieldKind};
use crate::namespace::Namespace;
use serde::{Deserialize, Serialize};

/// Outcome for one formula field. Serializes as a number or `null`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Computed {
    Number(f64),
    Uncomputable,
}

impl Computed {
    pub fn as_number(self) -> Option<f64> {
        match self {
            Computed::Number(n) => Some(n),
            Computed::Uncomputable => None,
        }
    }

    pub fn is_uncomputable(self) -> bool {
        matches!(self, Computed::Uncomputable)
    }
}

impl From<Option<f64>> for Computed {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Computed::Uncomputable, Computed::Number)
    }
}

impl From<Computed> for Option<f64> {
    fn from(value: Computed) -> Self {
        value.as_number()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputedField {
    pub key: String,
    #[serde(rename = "value")]
    pub result: Computed,
}

/// One entity to evaluate in a batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityInput {
    pub entity_id: EntityId,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub values: EntryValues,
}

#[derive(Clone, Debug, Default)]
pub struct FormulaDriver {
    config: EvaluatorConfig,
}

impl FormulaDriver {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Compute every formula field of one entity, in field order.
    ///
    /// Never fails: a formula that is empty, rejected by the guard, malformed, or faults while
    /// evaluating yields [`Computed::Uncomputable`] and the pass moves on.
    pub fn evaluate(
        &self,
        fields: &[FieldDef],
        values: &EntryValues,
        cross_entity: &CrossEntitySnapshot,
    ) -> Vec<ComputedField> {
        self.evaluate_reporting(fields, values, cross_entity, |_, _| {})
    }

    /// Like [`FormulaDriver::evaluate`], but hands the error behind every uncomputable field to
    /// `on_error` together with the field key.
    pub fn evaluate_reporting(
        &self,
        fields: &[FieldDef],
        values: &EntryValues,
        cross_entity: &CrossEntitySnapshot,
        mut on_error: impl FnMut(&str, &FormulaError),
    ) -> Vec<ComputedField> {
        let mut namespace = Namespace::new();
        let mut out = Vec::new();

        for field in fields {
            match &field.kind {
                FieldKind::Number => {
                    log::trace!("binding number field {}", field.key);
                    namespace.bind_scalar(&field.key, values.scalar(&field.key));
                }
                FieldKind::Items { sub_fields } => {
                    let rows = values.list(&field.key);
                    log::trace!("binding list field {} ({} rows)", field.key, rows.len());
                    namespace.bind_list(&field.key, rows, sub_fields);
                }
                FieldKind::Text | FieldKind::Date | FieldKind::Boolean => {}
                FieldKind::Formula { expression } => {
                    let result =
                        match check_expression(expression, &namespace, cross_entity, &self.config)
                        {
                            Ok(n) => Computed::Number(n),
                            Err(err) => {
                                log::debug!(
                                    "formula field {} is uncomputable ({:?}): {err}",
                                    field.key,
                                    err.kind()
                                );
                                on_error(&field.key, &err);
                                Computed::Uncomputable
                            }
                        };
                    if let Computed::Number(n) = result {
                        namespace.bind_scalar(&field.key, Some(n));
                    }
                    out.push(ComputedField {
                        key: field.key.clone(),
                        result,
                    });
                }
            }
        }

        out
    }

    /// Evaluate several entities of the same tenant and period, each against a snapshot of its
    /// siblings built with [`CrossEntitySnapshot::from_siblings`].
    pub fn evaluate_entities<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a EntityInput>,
        siblings: &[SiblingEntry],
    ) -> Vec<EntityResult> {
        entities
            .into_iter()
            .map(|entity| {
                let cross_entity = CrossEntitySnapshot::from_siblings(entity.entity_id, siblings);
                EntityResult {
                    entity_id: entity.entity_id,
                    fields: self.evaluate(&entity.fields, &entity.values, &cross_entity),
                }
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityResult {
    pub entity_id: EntityId,
    pub fields: Vec<ComputedField>,
}
