// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Access request processing
//!
//! Resolves a subject's document graph into a nested [`Report`]. Starting at
//! the subject's own document, every locator a handler returns is fetched
//! and handed to its type's access handler in turn, depth first, until only
//! scalar values remain. The first error anywhere in the traversal aborts the
//! whole request.

use crate::config::EngineConfig;
use crate::document::Value;
use crate::error::{PalError, PalResult};
use crate::handler::{HandlerRegistry, OutputValue, TypeHandler};
use crate::locator::{Locator, LocatorKind};
use crate::storage::{FetchedDocument, StorageAdapter};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Resolved access output of one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    entries: BTreeMap<String, ReportEntry>,
}

/// One resolved report field
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEntry {
    /// Scalar copied from handler output
    Value(Value),
    /// A resolved document locator
    Document(Report),
    /// A resolved collection locator, in adapter order
    Collection(Vec<Report>),
    /// A resolved list of locators, in handler order
    List(Vec<ReportEntry>),
    /// A resolved map of locators
    Keyed(BTreeMap<String, ReportEntry>),
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ReportEntry> {
        self.entries.get(key)
    }

    pub(crate) fn insert(&mut self, key: String, entry: ReportEntry) {
        self.entries.insert(key, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ReportEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.to_json()))
                .collect(),
        )
    }

    pub fn to_json_string(&self) -> PalResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_string_pretty(&self) -> PalResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ReportEntry {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ReportEntry::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Report> {
        match self {
            ReportEntry::Document(report) => Some(report),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Report]> {
        match self {
            ReportEntry::Collection(reports) => Some(reports),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ReportEntry]> {
        match self {
            ReportEntry::List(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_keyed(&self) -> Option<&BTreeMap<String, ReportEntry>> {
        match self {
            ReportEntry::Keyed(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ReportEntry::Value(value) => value.to_json(),
            ReportEntry::Document(report) => report.to_json(),
            ReportEntry::Collection(reports) => {
                serde_json::Value::Array(reports.iter().map(Report::to_json).collect())
            }
            ReportEntry::List(entries) => {
                serde_json::Value::Array(entries.iter().map(ReportEntry::to_json).collect())
            }
            ReportEntry::Keyed(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, entry)| (key.clone(), entry.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl Serialize for ReportEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReportEntry::Value(value) => value.to_json().serialize(serializer),
            ReportEntry::Document(report) => report.serialize(serializer),
            ReportEntry::Collection(reports) => {
                let mut seq = serializer.serialize_seq(Some(reports.len()))?;
                for report in reports {
                    seq.serialize_element(report)?;
                }
                seq.end()
            }
            ReportEntry::List(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(entry)?;
                }
                seq.end()
            }
            ReportEntry::Keyed(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, entry) in entries {
                    map.serialize_entry(key, entry)?;
                }
                map.end()
            }
        }
    }
}

/// Walks the document graph for access requests
pub struct AccessProcessor<'a, A: StorageAdapter + ?Sized> {
    adapter: &'a A,
    registry: &'a HandlerRegistry,
    config: &'a EngineConfig,
}

impl<'a, A: StorageAdapter + ?Sized> AccessProcessor<'a, A> {
    pub fn new(adapter: &'a A, registry: &'a HandlerRegistry, config: &'a EngineConfig) -> Self {
        Self {
            adapter,
            registry,
            config,
        }
    }

    /// Build the report for `subject_id` rooted at the subject's document
    pub fn process(&self, root: &Locator, subject_id: &str) -> PalResult<Report> {
        if root.kind != LocatorKind::Document {
            return Err(PalError::Validation(format!(
                "access requests must start at a document locator, got {}",
                root
            )));
        }
        match self.resolve(root, subject_id, 0)? {
            ReportEntry::Document(report) => Ok(report),
            // a document locator always resolves to a document entry
            other => Err(PalError::Handler(format!(
                "root {} resolved to a non-document entry: {:?}",
                root, other
            ))),
        }
    }

    fn resolve(&self, locator: &Locator, subject_id: &str, depth: usize) -> PalResult<ReportEntry> {
        self.config.check_depth(depth, locator)?;
        locator.validate()?;
        let handler = self.registry.get(&locator.data_type)?;
        log::debug!("access: resolving {} at depth {}", locator, depth);

        match locator.kind {
            LocatorKind::Document => {
                let fetched = self.adapter.get_document(locator)?;
                let report = self.resolve_document(handler, &fetched, subject_id, depth)?;
                Ok(ReportEntry::Document(report))
            }
            LocatorKind::Collection => {
                let fetched = self.adapter.get_documents(locator)?;
                let reports = fetched
                    .iter()
                    .map(|doc| self.resolve_document(handler, doc, subject_id, depth))
                    .collect::<PalResult<Vec<_>>>()?;
                Ok(ReportEntry::Collection(reports))
            }
        }
    }

    fn resolve_document(
        &self,
        handler: &dyn TypeHandler,
        fetched: &FetchedDocument,
        subject_id: &str,
        depth: usize,
    ) -> PalResult<Report> {
        let output = handler.handle_access(subject_id, &fetched.locator, &fetched.document)?;

        let mut report = Report::new();
        for (key, value) in output {
            let entry = match value {
                OutputValue::Scalar(value) => ReportEntry::Value(value),
                OutputValue::One(locator) => self.resolve(&locator, subject_id, depth + 1)?,
                OutputValue::Many(locators) => ReportEntry::List(
                    locators
                        .iter()
                        .map(|locator| self.resolve(locator, subject_id, depth + 1))
                        .collect::<PalResult<_>>()?,
                ),
                OutputValue::Keyed(locators) => {
                    let mut resolved = BTreeMap::new();
                    for (name, locator) in locators {
                        resolved.insert(name, self.resolve(&locator, subject_id, depth + 1)?);
                    }
                    ReportEntry::Keyed(resolved)
                }
            };
            report.insert(key, entry);
        }
        Ok(report)
    }
}
