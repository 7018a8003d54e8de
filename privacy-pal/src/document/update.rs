// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Partial document mutations recorded in deletion plans

use super::{Document, Value};
use crate::error::{PalError, PalResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field-level mutation.
///
/// `field` may be a dotted path into nested maps. Adapters apply these when
/// committing a plan; handlers return them instead of deleting a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldUpdate {
    Set { field: String, value: Value },
    Unset { field: String },
    ArrayUnion { field: String, values: Vec<Value> },
    ArrayRemove { field: String, values: Vec<Value> },
}

impl FieldUpdate {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldUpdate::Set {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn unset(field: impl Into<String>) -> Self {
        FieldUpdate::Unset {
            field: field.into(),
        }
    }

    pub fn array_union(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldUpdate::ArrayUnion {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn array_remove(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldUpdate::ArrayRemove {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldUpdate::Set { field, .. }
            | FieldUpdate::Unset { field }
            | FieldUpdate::ArrayUnion { field, .. }
            | FieldUpdate::ArrayRemove { field, .. } => field,
        }
    }

    /// Apply this mutation to `document` in place
    pub fn apply(&self, document: &mut Document) -> PalResult<()> {
        let (parents, leaf) = split_path(self.field())?;
        let container = descend(document.fields_mut(), &parents, self.creates_parents())?;
        let Some(container) = container else {
            // unset below a missing parent is a no-op
            return Ok(());
        };

        match self {
            FieldUpdate::Set { value, .. } => {
                container.insert(leaf.to_string(), value.clone());
            }
            FieldUpdate::Unset { .. } => {
                container.remove(leaf);
            }
            FieldUpdate::ArrayUnion { values, .. } => {
                let entry = container
                    .entry(leaf.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match entry {
                    Value::Array(items) => {
                        for value in values {
                            if !items.contains(value) {
                                items.push(value.clone());
                            }
                        }
                    }
                    other => return Err(not_an_array(self.field(), other)),
                }
            }
            FieldUpdate::ArrayRemove { values, .. } => match container.get_mut(leaf) {
                Some(Value::Array(items)) => items.retain(|item| !values.contains(item)),
                Some(other) => return Err(not_an_array(self.field(), other)),
                None => {}
            },
        }
        Ok(())
    }

    fn creates_parents(&self) -> bool {
        !matches!(self, FieldUpdate::Unset { .. } | FieldUpdate::ArrayRemove { .. })
    }
}

/// Apply a list of updates in order
pub fn apply_all(document: &mut Document, updates: &[FieldUpdate]) -> PalResult<()> {
    for update in updates {
        update.apply(document)?;
    }
    Ok(())
}

fn split_path(path: &str) -> PalResult<(Vec<&str>, &str)> {
    let mut segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PalError::Backend(format!("invalid field path '{}'", path)));
    }
    let leaf = segments.pop().unwrap_or_default();
    Ok((segments, leaf))
}

fn descend<'a>(
    mut map: &'a mut BTreeMap<String, Value>,
    parents: &[&str],
    create: bool,
) -> PalResult<Option<&'a mut BTreeMap<String, Value>>> {
    for segment in parents {
        if !map.contains_key(*segment) {
            if !create {
                return Ok(None);
            }
            map.insert(segment.to_string(), Value::Map(BTreeMap::new()));
        }
        map = match map.get_mut(*segment) {
            Some(Value::Map(inner)) => inner,
            Some(other) => {
                return Err(PalError::Backend(format!(
                    "cannot descend into '{}': found {}",
                    segment,
                    other.type_name()
                )))
            }
            None => return Ok(None),
        };
    }
    Ok(Some(map))
}

fn not_an_array(field: &str, found: &Value) -> PalError {
    PalError::Backend(format!(
        "array update on '{}' which holds {}",
        field,
        found.type_name()
    ))
}
