// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory hierarchical document store
//!
//! Resolves [`Address::Path`] locators: collections nest beneath documents
//! (`gcs/{gc}/messages/{m}`), the way hierarchical document databases lay
//! data out. Collections keep insertion order, which is the order
//! collection fetches return.

use super::adapter::{FetchedDocument, StorageAdapter};
use crate::document::update::apply_all;
use crate::document::{Document, FieldUpdate};
use crate::error::{PalError, PalResult};
use crate::locator::{matches_all, Address, Locator, LocatorKind, PathAddress, PATH_SEPARATOR};
use crate::plan::DeletionPlan;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    /// Collection key (`gcs/gc1/messages`) to documents in insertion order
    collections: HashMap<String, Vec<(String, Document)>>,
}

impl MemoryState {
    fn find(&self, collection: &str, id: &str) -> Option<&Document> {
        self.collections
            .get(collection)?
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, doc)| doc)
    }

    fn find_mut(&mut self, collection: &str, id: &str) -> Option<&mut Document> {
        self.collections
            .get_mut(collection)?
            .iter_mut()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, doc)| doc)
    }

    fn upsert(&mut self, collection: String, id: String, document: Document) {
        let docs = self.collections.entry(collection).or_default();
        match docs.iter_mut().find(|(doc_id, _)| *doc_id == id) {
            Some((_, existing)) => *existing = document,
            None => docs.push((id, document)),
        }
    }

    fn remove(&mut self, collection: &str, id: &str) -> bool {
        let Some(docs) = self.collections.get_mut(collection) else {
            return false;
        };
        let before = docs.len();
        docs.retain(|(doc_id, _)| doc_id != id);
        docs.len() != before
    }
}

/// In-memory store for hierarchical (path) addresses
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create a new, empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document under a generated id and return the id.
    ///
    /// `parent_ids` names the documents the collection nests beneath and has
    /// one entry less than `collection_path`.
    pub fn add(
        &self,
        collection_path: &[&str],
        parent_ids: &[&str],
        document: Document,
    ) -> PalResult<String> {
        if collection_path.is_empty() || parent_ids.len() + 1 != collection_path.len() {
            return Err(PalError::Validation(format!(
                "cannot add to {:?} with parent ids {:?}",
                collection_path, parent_ids
            )));
        }
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut doc_ids = parent_ids.to_vec();
        doc_ids.push(id.as_str());
        Locator::path_document("", collection_path.to_vec(), doc_ids).validate()?;
        let key = collection_key(collection_path, parent_ids);
        self.state
            .write()
            .upsert(key, id.clone(), document.without_id());
        Ok(id)
    }

    /// Insert or replace the document a locator names
    pub fn set(&self, locator: &Locator, document: Document) -> PalResult<()> {
        let (collection, id) = document_slot(locator)?;
        self.state
            .write()
            .upsert(collection, id.to_string(), document.without_id());
        Ok(())
    }

    /// Apply field updates to one document outside of any plan
    pub fn update_document(&self, locator: &Locator, updates: &[FieldUpdate]) -> PalResult<()> {
        let (collection, id) = document_slot(locator)?;
        let mut state = self.state.write();
        let document = state
            .find_mut(&collection, id)
            .ok_or_else(|| PalError::NotFound(locator.to_string()))?;
        apply_all(document, updates)
    }

    /// Total number of stored documents
    pub fn document_count(&self) -> usize {
        self.state
            .read()
            .collections
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Copy of every document keyed by its full path
    pub fn snapshot(&self) -> BTreeMap<String, Document> {
        let state = self.state.read();
        state
            .collections
            .iter()
            .flat_map(|(collection, docs)| {
                docs.iter()
                    .map(move |(id, doc)| {
                        (format!("{}{}{}", collection, PATH_SEPARATOR, id), doc.clone())
                    })
            })
            .collect()
    }
}

impl StorageAdapter for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_document(&self, locator: &Locator) -> PalResult<FetchedDocument> {
        locator.validate()?;
        let (collection, id) = document_slot(locator)?;
        let path = path_address(locator)?;

        let state = self.state.read();
        let stored = state
            .find(&collection, id)
            .ok_or_else(|| PalError::NotFound(locator.to_string()))?;

        let mut document = stored.clone();
        document.set_id(id);
        Ok(FetchedDocument {
            locator: Locator::path_document(
                locator.data_type.clone(),
                path.collection_path.clone(),
                path.doc_ids.clone(),
            ),
            document,
        })
    }

    fn get_documents(&self, locator: &Locator) -> PalResult<Vec<FetchedDocument>> {
        locator.validate()?;
        if locator.kind != LocatorKind::Collection {
            return Err(PalError::Validation(format!(
                "expected a collection locator, got {}",
                locator
            )));
        }
        let path = path_address(locator)?;
        let key = collection_key(&path.collection_path, &path.doc_ids);

        let state = self.state.read();
        let Some(docs) = state.collections.get(&key) else {
            return Ok(Vec::new());
        };

        let mut fetched = Vec::new();
        for (id, stored) in docs {
            let mut document = stored.clone();
            document.set_id(id.clone());
            if !matches_all(&path.filters, &document) {
                continue;
            }
            let mut doc_ids = path.doc_ids.clone();
            doc_ids.push(id.clone());
            fetched.push(FetchedDocument {
                locator: Locator::path_document(
                    locator.data_type.clone(),
                    path.collection_path.clone(),
                    doc_ids,
                ),
                document,
            });
        }
        log::debug!("memory: {} matched {} document(s)", locator, fetched.len());
        Ok(fetched)
    }

    fn apply_plan(&self, plan: &DeletionPlan) -> PalResult<()> {
        let mut state = self.state.write();
        // Stage on a copy so a failure leaves the store untouched
        let mut staged = state.clone();

        for locator in &plan.deletes {
            let (collection, id) = document_slot(locator)?;
            if !staged.remove(&collection, id) {
                log::debug!("memory: {} already absent", locator);
            }
        }

        for update in &plan.updates {
            let (collection, id) = document_slot(&update.locator)?;
            let document = staged.find_mut(&collection, id).ok_or_else(|| {
                PalError::Backend(format!(
                    "cannot update missing document {}",
                    update.locator
                ))
            })?;
            apply_all(document, &update.updates)?;
        }

        *state = staged;
        Ok(())
    }
}

fn path_address(locator: &Locator) -> PalResult<&PathAddress> {
    match &locator.address {
        Address::Path(path) => Ok(path),
        other => Err(PalError::Validation(format!(
            "memory store cannot resolve the {} address of {}",
            other.convention(),
            locator
        ))),
    }
}

/// Collection key and document id of a document locator
fn document_slot(locator: &Locator) -> PalResult<(String, &str)> {
    let path = path_address(locator)?;
    locator.validate()?;
    if locator.kind != LocatorKind::Document {
        return Err(PalError::Validation(format!(
            "expected a document locator, got {}",
            locator
        )));
    }
    match path.doc_ids.split_last() {
        Some((id, parents)) if path.doc_ids.len() == path.collection_path.len() => {
            Ok((collection_key(&path.collection_path, parents), id.as_str()))
        }
        _ => Err(PalError::Validation(format!(
            "malformed document locator {}",
            locator
        ))),
    }
}

/// Interleave collection names and parent ids: `gcs/gc1/messages`
fn collection_key<S: AsRef<str>, T: AsRef<str>>(collection_path: &[S], parent_ids: &[T]) -> String {
    let mut key = String::new();
    for (i, collection) in collection_path.iter().enumerate() {
        if i > 0 {
            key.push(PATH_SEPARATOR);
        }
        key.push_str(collection.as_ref());
        if let Some(id) = parent_ids.get(i) {
            key.push(PATH_SEPARATOR);
            key.push_str(id.as_ref());
        }
    }
    key
}
