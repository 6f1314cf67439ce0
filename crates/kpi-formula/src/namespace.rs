//! Per-evaluation symbol table.
//!
//! Binding precedence when the same name is registered more than once: scalar values (including
//! earlier formula results) over list fields over sub-field columns.

use crate::model::{EntryValues, ItemRow};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Binding {
    /// A scalar field or an earlier formula result. Unset/null scalars are bound as `0.0`.
    Number(f64),
    /// A list field key; only meaningful as a group-function argument.
    List,
    /// A sub-field key seen in (or declared for) some list field.
    Column,
}

#[derive(Clone, Debug, Default)]
pub struct Namespace<'a> {
    bindings: HashMap<String, Binding>,
    lists: HashMap<String, &'a [ItemRow]>,
}

impl<'a> Namespace<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every scalar and list of `values` at once.
    ///
    /// The driver registers fields one at a time instead, so that formulas only see fields
    /// declared before them; this is for callers evaluating a lone expression.
    pub fn build(values: &'a EntryValues) -> Self {
        let mut ns = Self::new();
        for (key, rows) in &values.lists {
            ns.bind_list(key, rows, &[]);
        }
        for (key, value) in &values.scalars {
            ns.bind_scalar(key, *value);
        }
        ns
    }

    pub fn bind_scalar(&mut self, key: &str, value: Option<f64>) {
        self.bindings
            .insert(key.to_string(), Binding::Number(value.unwrap_or(0.0)));
    }

    /// Register a list field, its rows, and every sub-field key found in the rows or declared in
    /// `sub_fields`.
    pub fn bind_list(&mut self, key: &str, rows: &'a [ItemRow], sub_fields: &[String]) {
        self.lists.insert(key.to_string(), rows);
        match self.bindings.get(key) {
            Some(Binding::Number(_)) => {}
            _ => {
                self.bindings.insert(key.to_string(), Binding::List);
            }
        }
        let observed = rows.iter().flat_map(|row| row.keys());
        for sub_key in sub_fields.iter().chain(observed) {
            self.bindings
                .entry(sub_key.clone())
                .or_insert(Binding::Column);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Binding> {
        self.bindings.get(name).copied()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Rows of a registered list field; an unknown key has no rows.
    pub fn rows(&self, list_key: &str) -> &'a [ItemRow] {
        self.lists.get(list_key).copied().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
