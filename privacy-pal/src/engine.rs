// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Engine facade
//!
//! [`PrivacyEngine`] binds one storage adapter, one handler registry and
//! one configuration, and exposes the two request operations. Its own logic
//! is limited to checking request parameters and tagging errors with the
//! request they came from.

use crate::access::{AccessProcessor, Report};
use crate::config::EngineConfig;
use crate::deletion::DeletionProcessor;
use crate::error::{PalError, PalResult, RequestError};
use crate::handler::HandlerRegistry;
use crate::locator::{Locator, LocatorKind};
use crate::plan::DeletionOutcome;
use crate::storage::StorageAdapter;

/// Entry point for privacy access and erasure requests
pub struct PrivacyEngine<A: StorageAdapter> {
    adapter: A,
    registry: HandlerRegistry,
    config: EngineConfig,
}

impl<A: StorageAdapter> PrivacyEngine<A> {
    /// Create an engine with the default configuration
    pub fn new(adapter: A, registry: HandlerRegistry) -> Self {
        Self::with_config(adapter, registry, EngineConfig::default())
    }

    pub fn with_config(adapter: A, registry: HandlerRegistry, config: EngineConfig) -> Self {
        log::debug!(
            "Creating privacy engine on {} storage with {} handler(s)",
            adapter.name(),
            registry.len()
        );
        Self {
            adapter,
            registry,
            config,
        }
    }

    /// Collect everything reachable from the subject's document that
    /// concerns `subject_id`
    pub fn process_access_request(
        &self,
        subject_locator: &Locator,
        subject_id: &str,
    ) -> Result<Report, RequestError> {
        log::info!(
            "Processing access request for subject '{}' at {}",
            subject_id,
            subject_locator
        );
        let report = check_request(subject_locator, subject_id)
            .and_then(|()| {
                AccessProcessor::new(&self.adapter, &self.registry, &self.config)
                    .process(subject_locator, subject_id)
            })
            .map_err(RequestError::access)?;
        log::info!(
            "Access request for subject '{}' produced {} top-level field(s)",
            subject_id,
            report.len()
        );
        Ok(report)
    }

    /// Plan the erasure of `subject_id`'s data and, when `commit` is set,
    /// apply the plan atomically. A dry run writes nothing but returns the
    /// same plan.
    pub fn process_deletion_request(
        &self,
        subject_locator: &Locator,
        subject_id: &str,
        commit: bool,
    ) -> Result<DeletionOutcome, RequestError> {
        log::info!(
            "Processing deletion request for subject '{}' at {} (commit: {})",
            subject_id,
            subject_locator,
            commit
        );
        let outcome = self
            .run_deletion(subject_locator, subject_id, commit)
            .map_err(RequestError::deletion)?;
        log::info!(
            "Deletion request for subject '{}' planned {} delete(s) and {} update(s), committed: {}",
            subject_id,
            outcome.plan.deletes.len(),
            outcome.plan.updates.len(),
            outcome.committed
        );
        Ok(outcome)
    }

    fn run_deletion(
        &self,
        subject_locator: &Locator,
        subject_id: &str,
        commit: bool,
    ) -> PalResult<DeletionOutcome> {
        check_request(subject_locator, subject_id)?;
        let plan = DeletionProcessor::new(&self.adapter, &self.registry, &self.config)
            .compute_plan(subject_locator, subject_id)?;

        if self.config.verify_plan {
            plan.check_disjoint()?;
        }

        if commit {
            if let Err(error) = self.adapter.apply_plan(&plan) {
                log::warn!(
                    "Commit of deletion plan for subject '{}' failed on {} storage: {}",
                    subject_id,
                    self.adapter.name(),
                    error
                );
                return Err(error);
            }
        }

        Ok(DeletionOutcome {
            plan,
            committed: commit,
        })
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn check_request(subject_locator: &Locator, subject_id: &str) -> PalResult<()> {
    if subject_id.is_empty() {
        return Err(PalError::Validation(
            "subject id must not be empty".to_string(),
        ));
    }
    if subject_locator.kind != LocatorKind::Document {
        return Err(PalError::Validation(format!(
            "subject locator must address a single document, got {}",
            subject_locator
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::error::RequestKind;
    use crate::handler::{AccessOutput, DeletionDirective, OutputValue};
    use crate::storage::MemoryStore;

    fn profile_engine() -> (PrivacyEngine<MemoryStore>, Locator) {
        let store = MemoryStore::new();
        let root = Locator::path_document("profile", ["profiles"], ["p1"]);
        store
            .set(&root, Document::new().with("email", "a@example.com"))
            .unwrap();

        let mut registry = HandlerRegistry::new();
        registry
            .register_fn(
                "profile",
                |_, _, doc| {
                    let mut out = AccessOutput::new();
                    out.insert(
                        "Email".to_string(),
                        OutputValue::Scalar(doc.str_field("email")?.into()),
                    );
                    Ok(out)
                },
                |_, _, _| Ok(DeletionDirective::delete()),
            )
            .unwrap();
        (PrivacyEngine::new(store, registry), root)
    }

    #[test]
    fn test_empty_subject_rejected() {
        let (engine, root) = profile_engine();
        let err = engine.process_access_request(&root, "").unwrap_err();
        assert_eq!(err.kind, RequestKind::Access);
        assert!(matches!(err.source, PalError::Validation(_)));
    }

    #[test]
    fn test_dry_run_then_commit() {
        let (engine, root) = profile_engine();

        let dry = engine.process_deletion_request(&root, "p1", false).unwrap();
        assert!(!dry.committed);
        assert_eq!(engine.adapter().document_count(), 1);

        let committed = engine.process_deletion_request(&root, "p1", true).unwrap();
        assert!(committed.committed);
        assert_eq!(committed.plan, dry.plan);
        assert_eq!(engine.adapter().document_count(), 0);
    }

    #[test]
    fn test_errors_are_tagged_with_request_kind() {
        let (engine, _) = profile_engine();
        let missing = Locator::path_document("profile", ["profiles"], ["nobody"]);

        let err = engine.process_deletion_request(&missing, "p1", true).unwrap_err();
        assert_eq!(err.kind, RequestKind::Deletion);
        assert!(matches!(err.source, PalError::NotFound(_)));
    }
}
