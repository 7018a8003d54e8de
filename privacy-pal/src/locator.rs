// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Locators - addressing values for documents and filtered collections
//!
//! A [`Locator`] names either one document or a filtered set of documents
//! and carries the logical data type that selects the handler pair. The
//! backend-specific part is an [`Address`]:
//!
//! ```text
//! Address::Path  users/{u1}/chats/{c1}          hierarchical stores
//! Address::Flat  messages where userId == u1    flat collection + filter stores
//! ```
//!
//! A locator is only ever interpreted by the adapter owning its address
//! convention.

use crate::document::{Document, Value, ID_FIELD};
use crate::error::{PalError, PalResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Separator between the segments of a hierarchical path
pub const PATH_SEPARATOR: char = '/';

/// Whether a locator names one document or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    Document,
    Collection,
}

/// Comparison operator of a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Array field contains the value
    ArrayContains,
    /// Field equals one of the values of an array operand
    In,
}

/// Field predicate applied to collection members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Check the predicate against a document. Missing fields never match,
    /// except for `Ne`.
    pub fn matches(&self, document: &Document) -> bool {
        let Some(actual) = document.get_path(&self.field) else {
            return self.op == FilterOp::Ne;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Lt => actual.compare(&self.value) == Some(Ordering::Less),
            FilterOp::Le => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => actual.compare(&self.value) == Some(Ordering::Greater),
            FilterOp::Ge => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.contains(&self.value)),
            FilterOp::In => self
                .value
                .as_array()
                .is_some_and(|candidates| candidates.contains(actual)),
        }
    }
}

/// Check every filter of a list against a document
pub fn matches_all(filters: &[Filter], document: &Document) -> bool {
    filters.iter().all(|filter| filter.matches(document))
}

/// Hierarchical address: alternating collection and document segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathAddress {
    /// Collection names from the root, e.g. `["gcs", "messages"]`
    pub collection_path: Vec<String>,
    /// Document ids in collection order
    pub doc_ids: Vec<String>,
    /// Ignored for document locators
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

/// Flat address: one named collection plus a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatAddress {
    pub collection: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

/// Backend-specific part of a locator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "convention", rename_all = "snake_case")]
pub enum Address {
    Path(PathAddress),
    Flat(FlatAddress),
}

impl Address {
    pub fn convention(&self) -> &'static str {
        match self {
            Address::Path(_) => "path",
            Address::Flat(_) => "flat",
        }
    }
}

/// Addressing value naming one document or a filtered set of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locator {
    pub kind: LocatorKind,
    pub data_type: String,
    pub address: Address,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl Locator {
    /// Document in a hierarchical store, e.g. `gcs/{id}`
    pub fn path_document<P, S, D, T>(data_type: impl Into<String>, collection_path: P, doc_ids: D) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
        D: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            kind: LocatorKind::Document,
            data_type: data_type.into(),
            address: Address::Path(PathAddress {
                collection_path: strings(collection_path),
                doc_ids: strings(doc_ids),
                filters: Vec::new(),
            }),
        }
    }

    /// Filtered collection in a hierarchical store; `parent_ids` has one
    /// entry less than `collection_path`
    pub fn path_collection<P, S, D, T>(
        data_type: impl Into<String>,
        collection_path: P,
        parent_ids: D,
        filters: Vec<Filter>,
    ) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
        D: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            kind: LocatorKind::Collection,
            data_type: data_type.into(),
            address: Address::Path(PathAddress {
                collection_path: strings(collection_path),
                doc_ids: strings(parent_ids),
                filters,
            }),
        }
    }

    /// Document in a flat store, selected by its `_id`
    pub fn flat_document(
        data_type: impl Into<String>,
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            kind: LocatorKind::Document,
            data_type: data_type.into(),
            address: Address::Flat(FlatAddress {
                collection: collection.into(),
                filters: vec![Filter::eq(ID_FIELD, Value::String(id.into()))],
            }),
        }
    }

    /// Filtered collection in a flat store
    pub fn flat_collection(
        data_type: impl Into<String>,
        collection: impl Into<String>,
        filters: Vec<Filter>,
    ) -> Self {
        Self {
            kind: LocatorKind::Collection,
            data_type: data_type.into(),
            address: Address::Flat(FlatAddress {
                collection: collection.into(),
                filters,
            }),
        }
    }

    pub fn is_document(&self) -> bool {
        self.kind == LocatorKind::Document
    }

    /// Sub-collection beneath a hierarchical document locator,
    /// e.g. `gcs/{id}` -> `gcs/{id}/messages`
    pub fn subcollection(
        &self,
        data_type: impl Into<String>,
        collection: impl Into<String>,
        filters: Vec<Filter>,
    ) -> PalResult<Locator> {
        let Address::Path(path) = &self.address else {
            return Err(PalError::Validation(format!(
                "sub-collections need a path address, {} has a {} address",
                self,
                self.address.convention()
            )));
        };
        if !self.is_document() {
            return Err(PalError::Validation(format!(
                "sub-collections can only be derived from document locators, got {}",
                self
            )));
        }

        let mut collection_path = path.collection_path.clone();
        collection_path.push(collection.into());
        Ok(Locator::path_collection(
            data_type,
            collection_path,
            path.doc_ids.clone(),
            filters,
        ))
    }

    /// Identifier of the addressed document, when the address names one
    pub fn document_id(&self) -> Option<&str> {
        if !self.is_document() {
            return None;
        }
        match &self.address {
            Address::Path(path) => path.doc_ids.last().map(String::as_str),
            Address::Flat(flat) => flat
                .filters
                .iter()
                .find(|f| f.field == ID_FIELD && f.op == FilterOp::Eq)
                .and_then(|f| f.value.as_string()),
        }
    }

    /// Check the locator is well formed
    pub fn validate(&self) -> PalResult<()> {
        match &self.address {
            Address::Path(path) => {
                let segments = path.collection_path.len();
                if segments == 0 {
                    return Err(PalError::Validation(
                        "collection path must have at least one element".to_string(),
                    ));
                }
                for segment in &path.collection_path {
                    check_path_segment("collection name", segment)?;
                }
                for id in &path.doc_ids {
                    check_path_segment("document id", id)?;
                }
                let ids = path.doc_ids.len();
                match self.kind {
                    LocatorKind::Document if ids != segments => {
                        Err(PalError::Validation(format!(
                            "document locator must have as many document ids as collection path elements ({} ids, {} segments)",
                            ids, segments
                        )))
                    }
                    LocatorKind::Collection if ids + 1 != segments => {
                        Err(PalError::Validation(format!(
                            "collection locator must have one document id less than collection path elements ({} ids, {} segments)",
                            ids, segments
                        )))
                    }
                    _ => Ok(()),
                }
            }
            Address::Flat(flat) => {
                if flat.collection.is_empty() {
                    return Err(PalError::Validation(
                        "flat locator must name a collection".to_string(),
                    ));
                }
                if flat.collection.contains('\0') {
                    return Err(PalError::Validation(format!(
                        "collection name {:?} must not contain NUL",
                        flat.collection
                    )));
                }
                if self.kind == LocatorKind::Document && flat.filters.is_empty() {
                    return Err(PalError::Validation(format!(
                        "document locator on '{}' needs a filter selecting the document",
                        flat.collection
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Path segments are joined with `/`, so a segment holding one would name
/// a different, nested location
fn check_path_segment(what: &str, segment: &str) -> PalResult<()> {
    if segment.is_empty() {
        return Err(PalError::Validation(format!("{} must not be empty", what)));
    }
    if segment.contains(PATH_SEPARATOR) {
        return Err(PalError::Validation(format!(
            "{} '{}' must not contain '{}'",
            what, segment, PATH_SEPARATOR
        )));
    }
    Ok(())
}

/// Free-function form of [`Locator::validate`]
pub fn validate(locator: &Locator) -> PalResult<()> {
    locator.validate()
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.data_type)?;
        match &self.address {
            Address::Path(path) => {
                for (i, collection) in path.collection_path.iter().enumerate() {
                    if i > 0 {
                        write!(f, "/")?;
                    }
                    write!(f, "{}", collection)?;
                    if let Some(id) = path.doc_ids.get(i) {
                        write!(f, "/{}", id)?;
                    }
                }
                if self.kind == LocatorKind::Collection {
                    write_filters(f, &path.filters)?;
                }
                Ok(())
            }
            Address::Flat(flat) => {
                write!(f, "{}", flat.collection)?;
                write_filters(f, &flat.filters)
            }
        }
    }
}

fn write_filters(f: &mut fmt::Formatter<'_>, filters: &[Filter]) -> fmt::Result {
    if filters.is_empty() {
        return Ok(());
    }
    write!(f, "[")?;
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} {:?} {}", filter.field, filter.op, filter.value)?;
    }
    write!(f, "]")
}
