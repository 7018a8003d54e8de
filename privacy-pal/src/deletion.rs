// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Deletion request processing
//!
//! Computes a [`DeletionPlan`] by walking the subject's document graph.
//! Each document's children are planned before the document itself, so a
//! handler always sees its references as they are before the erasure.
//! Every visited document lands in the plan exactly once: in `deletes` when
//! its handler asks for removal, otherwise in `updates`, even when there is
//! nothing to change.

use crate::config::EngineConfig;
use crate::error::{PalError, PalResult};
use crate::handler::HandlerRegistry;
use crate::locator::{Locator, LocatorKind};
use crate::plan::DeletionPlan;
use crate::storage::StorageAdapter;

/// Walks the document graph for deletion requests
pub struct DeletionProcessor<'a, A: StorageAdapter + ?Sized> {
    adapter: &'a A,
    registry: &'a HandlerRegistry,
    config: &'a EngineConfig,
}

impl<'a, A: StorageAdapter + ?Sized> DeletionProcessor<'a, A> {
    pub fn new(adapter: &'a A, registry: &'a HandlerRegistry, config: &'a EngineConfig) -> Self {
        Self {
            adapter,
            registry,
            config,
        }
    }

    /// Compute the plan that erases `subject_id`'s data. Nothing is written.
    pub fn compute_plan(&self, root: &Locator, subject_id: &str) -> PalResult<DeletionPlan> {
        if root.kind != LocatorKind::Document {
            return Err(PalError::Validation(format!(
                "deletion requests must start at a document locator, got {}",
                root
            )));
        }
        let mut plan = DeletionPlan::new();
        self.visit(root, subject_id, 0, &mut plan)?;
        log::debug!(
            "deletion: planned {} delete(s) and {} update(s)",
            plan.deletes.len(),
            plan.updates.len()
        );
        Ok(plan)
    }

    fn visit(
        &self,
        locator: &Locator,
        subject_id: &str,
        depth: usize,
        plan: &mut DeletionPlan,
    ) -> PalResult<()> {
        self.config.check_depth(depth, locator)?;
        locator.validate()?;
        let handler = self.registry.get(&locator.data_type)?;
        log::debug!("deletion: visiting {} at depth {}", locator, depth);

        for fetched in self.adapter.fetch(locator)? {
            let directive =
                handler.handle_deletion(subject_id, &fetched.locator, &fetched.document)?;

            for child in &directive.children {
                self.visit(child, subject_id, depth + 1, plan)?;
            }

            if directive.delete_self {
                plan.push_delete(fetched.locator);
            } else {
                plan.push_update(fetched.locator, directive.updates);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, FieldUpdate};
    use crate::handler::{AccessOutput, DeletionDirective};
    use crate::storage::MemoryStore;

    /// A folder keeps itself but drops its owner; its notes are deleted
    fn folder_fixture() -> (MemoryStore, HandlerRegistry, Locator) {
        let store = MemoryStore::new();
        let folder = store
            .add(&["folders"], &[], Document::new().with("owner", "u1"))
            .unwrap();
        for text in ["a", "b"] {
            store
                .add(
                    &["folders", "notes"],
                    &[folder.as_str()],
                    Document::new().with("text", text),
                )
                .unwrap();
        }

        let mut registry = HandlerRegistry::new();
        registry
            .register_fn(
                "folder",
                |_, _, _| Ok(AccessOutput::new()),
                |_, locator, _| {
                    let notes = locator.subcollection("note", "notes", vec![])?;
                    Ok(DeletionDirective::update(vec![FieldUpdate::unset("owner")])
                        .with_children(vec![notes]))
                },
            )
            .unwrap();
        registry
            .register_fn(
                "note",
                |_, _, _| Ok(AccessOutput::new()),
                |_, _, _| Ok(DeletionDirective::delete()),
            )
            .unwrap();

        let root = Locator::path_document("folder", ["folders"], [folder.as_str()]);
        (store, registry, root)
    }

    #[test]
    fn test_children_planned_before_parent() {
        let (store, registry, root) = folder_fixture();
        let config = EngineConfig::default();
        let plan = DeletionProcessor::new(&store, &registry, &config)
            .compute_plan(&root, "u1")
            .unwrap();

        assert_eq!(plan.deletes.len(), 2);
        assert!(plan.deletes.iter().all(|l| l.data_type == "note"));
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].locator, root);
        assert_eq!(plan.updates[0].updates, vec![FieldUpdate::unset("owner")]);
        // planning alone never writes
        assert_eq!(store.document_count(), 3);
    }

    #[test]
    fn test_empty_update_still_recorded() {
        let store = MemoryStore::new();
        let id = store.add(&["tags"], &[], Document::new()).unwrap();
        let mut registry = HandlerRegistry::new();
        registry
            .register_fn(
                "tag",
                |_, _, _| Ok(AccessOutput::new()),
                |_, _, _| Ok(DeletionDirective::default()),
            )
            .unwrap();

        let config = EngineConfig::default();
        let root = Locator::path_document("tag", ["tags"], [id.as_str()]);
        let plan = DeletionProcessor::new(&store, &registry, &config)
            .compute_plan(&root, "u1")
            .unwrap();

        assert!(plan.deletes.is_empty());
        assert_eq!(plan.updates.len(), 1);
        assert!(plan.updates[0].updates.is_empty());
    }

    #[test]
    fn test_unknown_child_type_aborts() {
        let (store, _, root) = folder_fixture();
        let mut registry = HandlerRegistry::new();
        registry
            .register_fn(
                "folder",
                |_, _, _| Ok(AccessOutput::new()),
                |_, locator, _| {
                    let widgets = locator.subcollection("widget", "notes", vec![])?;
                    Ok(DeletionDirective::delete().with_children(vec![widgets]))
                },
            )
            .unwrap();

        let config = EngineConfig::default();
        let err = DeletionProcessor::new(&store, &registry, &config)
            .compute_plan(&root, "u1")
            .unwrap_err();
        assert!(matches!(err, PalError::UnknownType(t) if t == "widget"));
    }
}
