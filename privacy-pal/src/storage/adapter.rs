// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage adapter trait
//!
//! This module defines the contract between the engine and a physical
//! document database. All adapters must implement it to take part in
//! request processing.

use crate::document::Document;
use crate::error::PalResult;
use crate::locator::{Locator, LocatorKind};
use crate::plan::DeletionPlan;
use std::sync::Arc;

/// A fetched document together with the document locator naming it.
///
/// For collection fetches the adapter derives the per-document locator from
/// the collection address, so handlers and plans always see concrete
/// documents.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub locator: Locator,
    pub document: Document,
}

/// Document database backend used by the processors
///
/// Adapters must be safe for concurrent use; the engine itself never issues
/// more than one call at a time per request.
pub trait StorageAdapter: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Fetch the single document a Document locator names.
    ///
    /// Fails with [`crate::PalError::NotFound`] when it does not exist.
    fn get_document(&self, locator: &Locator) -> PalResult<FetchedDocument>;

    /// Fetch the documents a Collection locator selects, in backend order.
    ///
    /// An empty result is not an error.
    fn get_documents(&self, locator: &Locator) -> PalResult<Vec<FetchedDocument>>;

    /// Apply every deletion and update of `plan` as one atomic unit
    fn apply_plan(&self, plan: &DeletionPlan) -> PalResult<()>;

    /// Fetch one or many documents depending on the locator kind
    fn fetch(&self, locator: &Locator) -> PalResult<Vec<FetchedDocument>> {
        match locator.kind {
            LocatorKind::Document => Ok(vec![self.get_document(locator)?]),
            LocatorKind::Collection => self.get_documents(locator),
        }
    }
}

// Lets the engine own a shared or boxed adapter seamlessly
impl<T: StorageAdapter + ?Sized> StorageAdapter for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get_document(&self, locator: &Locator) -> PalResult<FetchedDocument> {
        (**self).get_document(locator)
    }

    fn get_documents(&self, locator: &Locator) -> PalResult<Vec<FetchedDocument>> {
        (**self).get_documents(locator)
    }

    fn apply_plan(&self, plan: &DeletionPlan) -> PalResult<()> {
        (**self).apply_plan(plan)
    }
}

impl<T: StorageAdapter + ?Sized> StorageAdapter for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get_document(&self, locator: &Locator) -> PalResult<FetchedDocument> {
        (**self).get_document(locator)
    }

    fn get_documents(&self, locator: &Locator) -> PalResult<Vec<FetchedDocument>> {
        (**self).get_documents(locator)
    }

    fn apply_plan(&self, plan: &DeletionPlan) -> PalResult<()> {
        (**self).apply_plan(plan)
    }
}
