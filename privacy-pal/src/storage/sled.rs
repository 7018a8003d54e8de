// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Sled-backed flat document store
//!
//! Resolves [`Address::Flat`] locators: every document lives in a named
//! collection and is selected by filters, the way flat document databases
//! address data. Documents are kept in a single sled tree under
//! `collection \0 id` keys with bincode-encoded bodies; ids come from
//! sled's monotonic id generator, so key order is insertion order.

use super::adapter::{FetchedDocument, StorageAdapter};
use crate::document::update::apply_all;
use crate::document::{Document, FieldUpdate, ID_FIELD};
use crate::error::{PalError, PalResult};
use crate::locator::{matches_all, Address, Filter, FilterOp, FlatAddress, Locator, LocatorKind};
use crate::plan::DeletionPlan;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use std::path::Path;

const DOCUMENTS_TREE: &str = "documents";
const KEY_SEPARATOR: u8 = 0;

/// Key, id and decoded body of a stored document
type Selected = (Vec<u8>, String, Document);

/// Flat document store on sled
pub struct SledStore {
    db: sled::Db,
    documents: sled::Tree,
}

impl SledStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> PalResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway store that is removed when dropped
    pub fn temporary() -> PalResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> PalResult<Self> {
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        Ok(Self { db, documents })
    }

    /// Insert a document under a generated id and return the id
    pub fn insert(&self, collection: &str, document: Document) -> PalResult<String> {
        Locator::flat_collection("", collection, Vec::new()).validate()?;
        let id = format!("{:016x}", self.db.generate_id()?);
        self.documents.insert(
            document_key(collection, &id),
            bincode::serialize(&document.without_id())?,
        )?;
        Ok(id)
    }

    /// Apply field updates to the document a locator names
    pub fn update_document(&self, locator: &Locator, updates: &[FieldUpdate]) -> PalResult<()> {
        let flat = document_address(locator)?;
        let (key, _, mut document) = self
            .select(flat, Some(1))?
            .pop()
            .ok_or_else(|| PalError::NotFound(locator.to_string()))?;
        document.remove(ID_FIELD);
        apply_all(&mut document, updates)?;
        self.documents.insert(key, bincode::serialize(&document)?)?;
        Ok(())
    }

    /// Total number of stored documents
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> PalResult<()> {
        self.documents.flush()?;
        Ok(())
    }

    /// Matching documents of a collection in key order, with `_id` set,
    /// stopping after `limit` matches.
    ///
    /// An `_id` equality filter is answered with a single key lookup; only
    /// other filters walk the collection.
    fn select(&self, flat: &FlatAddress, limit: Option<usize>) -> PalResult<Vec<Selected>> {
        if let Some(id) = id_filter(&flat.filters) {
            let key = document_key(&flat.collection, id);
            let Some(raw) = self.documents.get(&key)? else {
                return Ok(Vec::new());
            };
            let mut document: Document = bincode::deserialize(&raw)?;
            document.set_id(id);
            if !matches_all(&flat.filters, &document) {
                return Ok(Vec::new());
            }
            return Ok(vec![(key, id.to_string(), document)]);
        }

        let prefix = collection_prefix(&flat.collection);
        let mut matched = Vec::new();
        for entry in self.documents.scan_prefix(&prefix) {
            if limit.is_some_and(|limit| matched.len() >= limit) {
                break;
            }
            let (key, raw) = entry?;
            let id = String::from_utf8_lossy(&key[prefix.len()..]).to_string();
            let mut document: Document = bincode::deserialize(&raw)?;
            document.set_id(id.clone());
            if matches_all(&flat.filters, &document) {
                matched.push((key.to_vec(), id, document));
            }
        }
        Ok(matched)
    }

    /// Key of the document a locator names, if it exists
    fn resolve_key(&self, locator: &Locator) -> PalResult<Option<Vec<u8>>> {
        let flat = document_address(locator)?;
        Ok(self.select(flat, Some(1))?.pop().map(|(key, _, _)| key))
    }
}

impl StorageAdapter for SledStore {
    fn name(&self) -> &'static str {
        "sled"
    }

    fn get_document(&self, locator: &Locator) -> PalResult<FetchedDocument> {
        locator.validate()?;
        let flat = document_address(locator)?;
        // first match wins, like a find-one query
        let (_, id, document) = self
            .select(flat, Some(1))?
            .pop()
            .ok_or_else(|| PalError::NotFound(locator.to_string()))?;
        Ok(FetchedDocument {
            locator: Locator::flat_document(locator.data_type.clone(), flat.collection.clone(), id),
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
        let flat = flat_address(locator)?;
        let fetched: Vec<FetchedDocument> = self
            .select(flat, None)?
            .into_iter()
            .map(|(_, id, document)| FetchedDocument {
                locator: Locator::flat_document(
                    locator.data_type.clone(),
                    flat.collection.clone(),
                    id,
                ),
                document,
            })
            .collect();
        log::debug!("sled: {} matched {} document(s)", locator, fetched.len());
        Ok(fetched)
    }

    fn apply_plan(&self, plan: &DeletionPlan) -> PalResult<()> {
        // Resolve filters to keys up front; the transaction only sees keys
        let mut delete_keys = Vec::with_capacity(plan.deletes.len());
        for locator in &plan.deletes {
            match self.resolve_key(locator)? {
                Some(key) => delete_keys.push(key),
                None => log::debug!("sled: {} already absent", locator),
            }
        }

        let mut update_keys = Vec::with_capacity(plan.updates.len());
        for update in &plan.updates {
            let key = self.resolve_key(&update.locator)?.ok_or_else(|| {
                PalError::Backend(format!(
                    "cannot update missing document {}",
                    update.locator
                ))
            })?;
            update_keys.push((key, &update.updates));
        }

        let result = self
            .documents
            .transaction(|tx| -> ConflictableTransactionResult<(), String> {
                for key in &delete_keys {
                    tx.remove(key.as_slice())?;
                }
                for (key, updates) in &update_keys {
                    let raw = tx.get(key.as_slice())?.ok_or_else(|| {
                        ConflictableTransactionError::Abort(format!(
                            "document vanished before update: {}",
                            String::from_utf8_lossy(key)
                        ))
                    })?;
                    let mut document: Document = bincode::deserialize(&raw)
                        .map_err(|e| ConflictableTransactionError::Abort(e.to_string()))?;
                    apply_all(&mut document, updates)
                        .map_err(|e| ConflictableTransactionError::Abort(e.to_string()))?;
                    let encoded = bincode::serialize(&document)
                        .map_err(|e| ConflictableTransactionError::Abort(e.to_string()))?;
                    tx.insert(key.as_slice(), encoded)?;
                }
                Ok(())
            });

        match result {
            Ok(()) => {
                self.documents.flush()?;
                Ok(())
            }
            Err(TransactionError::Abort(message)) => Err(PalError::Backend(message)),
            Err(TransactionError::Storage(error)) => Err(error.into()),
        }
    }
}

fn flat_address(locator: &Locator) -> PalResult<&FlatAddress> {
    match &locator.address {
        Address::Flat(flat) => Ok(flat),
        other => Err(PalError::Validation(format!(
            "sled store cannot resolve the {} address of {}",
            other.convention(),
            locator
        ))),
    }
}

/// Flat address of a document locator
fn document_address(locator: &Locator) -> PalResult<&FlatAddress> {
    let flat = flat_address(locator)?;
    if locator.kind != LocatorKind::Document {
        return Err(PalError::Validation(format!(
            "expected a document locator, got {}",
            locator
        )));
    }
    Ok(flat)
}

/// Document id of an `_id` equality filter
fn id_filter(filters: &[Filter]) -> Option<&str> {
    filters
        .iter()
        .find(|filter| filter.field == ID_FIELD && filter.op == FilterOp::Eq)
        .and_then(|filter| filter.value.as_string())
}

fn collection_prefix(collection: &str) -> Vec<u8> {
    let mut prefix = collection.as_bytes().to_vec();
    prefix.push(KEY_SEPARATOR);
    prefix
}

fn document_key(collection: &str, id: &str) -> Vec<u8> {
    let mut key = collection_prefix(collection);
    key.extend_from_slice(id.as_bytes());
    key
}
