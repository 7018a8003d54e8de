// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Deletion plans
//!
//! A plan is the flattened result of a deletion traversal: documents to
//! delete in full and documents to patch. It is computed before anything is
//! written and is applied by the storage adapter as a single unit.

use crate::document::FieldUpdate;
use crate::error::{PalError, PalResult};
use crate::locator::Locator;
use serde::{Deserialize, Serialize};

/// Field updates targeting one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub locator: Locator,
    pub updates: Vec<FieldUpdate>,
}

/// Deletions and updates accumulated over a whole traversal, in visit order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletionPlan {
    pub deletes: Vec<Locator>,
    pub updates: Vec<DocumentUpdate>,
}

impl DeletionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_delete(&mut self, locator: Locator) {
        self.deletes.push(locator);
    }

    pub(crate) fn push_update(&mut self, locator: Locator, updates: Vec<FieldUpdate>) {
        self.updates.push(DocumentUpdate { locator, updates });
    }

    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty()
    }

    /// Number of documents touched (deletes plus updates)
    pub fn len(&self) -> usize {
        self.deletes.len() + self.updates.len()
    }

    /// Whether `locator` is among the deletes
    pub fn is_deleted(&self, locator: &Locator) -> bool {
        self.deletes.contains(locator)
    }

    /// Updates recorded for `locator`, if any
    pub fn updates_for(&self, locator: &Locator) -> Option<&[FieldUpdate]> {
        self.updates
            .iter()
            .find(|update| &update.locator == locator)
            .map(|update| update.updates.as_slice())
    }

    /// Check that no document is both deleted and updated.
    ///
    /// Documents are compared by address, so two data types naming the same
    /// document still clash. Two paths reaching one document with different
    /// verdicts is a handler inconsistency.
    pub fn check_disjoint(&self) -> PalResult<()> {
        for update in &self.updates {
            let clashes = self
                .deletes
                .iter()
                .any(|deleted| deleted.address == update.locator.address);
            if clashes {
                return Err(PalError::Handler(format!(
                    "document {} is both deleted and updated by the plan",
                    update.locator
                )));
            }
        }
        Ok(())
    }
}

/// Result of a deletion request: the plan plus whether it was applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    #[serde(flatten)]
    pub plan: DeletionPlan,
    pub committed: bool,
}

impl DeletionOutcome {
    pub fn to_json_string(&self) -> PalResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
