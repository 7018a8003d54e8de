// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! PrivacyPal - privacy request processing over document databases
//!
//! PrivacyPal answers data-subject access and erasure requests. The
//! application describes its data model as one pair of callbacks per
//! document type; the engine walks the document graph from the subject's
//! own document and either builds a nested access report or computes a
//! deletion plan that the storage adapter applies atomically.
//!
//! # Features
//!
//! - **Backend agnostic**: everything goes through the [`StorageAdapter`] trait
//! - **Two addressing conventions**: hierarchical paths and flat
//!   collection + filter addresses
//! - **Dry runs**: deletion plans can be inspected before they are committed
//! - **Bundled adapters**: an in-memory hierarchical store and a sled-backed
//!   flat store
//!
//! # Usage
//!
//! ```ignore
//! use privacy_pal::{HandlerRegistry, Locator, MemoryStore, PrivacyEngine};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_fn("user", user_access, user_deletion)?;
//!
//! let engine = PrivacyEngine::new(MemoryStore::new(), registry);
//! let user = Locator::path_document("user", ["users"], ["u1"]);
//!
//! let report = engine.process_access_request(&user, "u1")?;
//! println!("{}", report.to_json_string_pretty()?);
//!
//! let outcome = engine.process_deletion_request(&user, "u1", false)?;
//! ```

pub mod access;
pub mod config;
pub mod deletion;
pub mod document;
pub mod engine;
pub mod error;
pub mod handler;
pub mod locator;
pub mod plan;
pub mod storage;

pub use access::{AccessProcessor, Report, ReportEntry};
pub use config::EngineConfig;
pub use deletion::DeletionProcessor;
pub use document::{Document, FieldUpdate, Value};
pub use engine::PrivacyEngine;
pub use error::{PalError, PalResult, RequestError, RequestKind};
pub use handler::{
    AccessOutput, DeletionDirective, FnHandler, HandlerRegistry, OutputValue, TypeHandler,
};
pub use locator::{validate, Address, Filter, FilterOp, FlatAddress, Locator, LocatorKind, PathAddress};
pub use plan::{DeletionOutcome, DeletionPlan, DocumentUpdate};
#[cfg(feature = "sled-backend")]
pub use storage::SledStore;
pub use storage::{open_adapter, FetchedDocument, MemoryStore, StorageAdapter, StorageType};

/// PrivacyPal version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// PrivacyPal crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
