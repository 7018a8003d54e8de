// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Documents as handed out by storage adapters
//!
//! A [`Document`] is an ordered field map plus the synthetic `_id` field the
//! adapter fills in from the backend's native identifier. Handlers read
//! documents through the typed accessors, which turn a missing or
//! wrongly-shaped field into a [`PalError::Handler`].

pub mod update;
pub mod value;

pub use update::FieldUpdate;
pub use value::Value;

use crate::error::{PalError, PalResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the synthetic identifier field
pub const ID_FIELD: &str = "_id";

/// A single stored document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Native identifier, when the adapter populated it
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_string)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields
            .insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Resolve a dotted path (`dms.u1`) through nested maps
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy without the synthetic `_id` field, the form adapters persist
    pub fn without_id(&self) -> Document {
        let mut copy = self.clone();
        copy.fields.remove(ID_FIELD);
        copy
    }

    pub(crate) fn fields_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.fields
    }

    fn require(&self, field: &str) -> PalResult<&Value> {
        self.get_path(field)
            .ok_or_else(|| PalError::Handler(format!("required field '{}' is missing", field)))
    }

    fn wrong_shape(field: &str, expected: &str, found: &Value) -> PalError {
        PalError::Handler(format!(
            "field '{}' should be {}, found {}",
            field,
            expected,
            found.type_name()
        ))
    }

    /// Required string field
    pub fn str_field(&self, field: &str) -> PalResult<&str> {
        let value = self.require(field)?;
        value
            .as_string()
            .ok_or_else(|| Self::wrong_shape(field, "a String", value))
    }

    /// Required array field
    pub fn array_field(&self, field: &str) -> PalResult<&[Value]> {
        let value = self.require(field)?;
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| Self::wrong_shape(field, "an Array", value))
    }

    /// Required array whose every element is a string
    pub fn string_array_field(&self, field: &str) -> PalResult<Vec<&str>> {
        self.array_field(field)?
            .iter()
            .map(|item| {
                item.as_string()
                    .ok_or_else(|| Self::wrong_shape(field, "an Array of String", item))
            })
            .collect()
    }

    /// Required map field
    pub fn map_field(&self, field: &str) -> PalResult<&BTreeMap<String, Value>> {
        let value = self.require(field)?;
        value
            .as_map()
            .ok_or_else(|| Self::wrong_shape(field, "a Map", value))
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
