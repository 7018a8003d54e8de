// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Type handlers and the handler registry
//!
//! The application describes its data model by registering one
//! [`TypeHandler`] per logical data type. Handlers are pure: they look at a
//! fetched document and its locator and either describe what belongs in the
//! access report or how the document takes part in an erasure. They never
//! perform I/O themselves; the processors do the fetching.

use crate::document::{Document, FieldUpdate, Value};
use crate::error::{PalError, PalResult};
use crate::locator::Locator;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// One entry of an access handler's output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    /// Copied verbatim into the report
    Scalar(Value),
    /// Replaced by the resolved sub-report
    One(Locator),
    /// Each locator resolved, order preserved
    Many(Vec<Locator>),
    /// Each locator resolved, keys preserved
    Keyed(BTreeMap<String, Locator>),
}

impl From<Locator> for OutputValue {
    fn from(locator: Locator) -> Self {
        OutputValue::One(locator)
    }
}

impl From<Vec<Locator>> for OutputValue {
    fn from(locators: Vec<Locator>) -> Self {
        OutputValue::Many(locators)
    }
}

impl From<BTreeMap<String, Locator>> for OutputValue {
    fn from(locators: BTreeMap<String, Locator>) -> Self {
        OutputValue::Keyed(locators)
    }
}

impl From<Value> for OutputValue {
    fn from(value: Value) -> Self {
        OutputValue::Scalar(value)
    }
}

/// Output of an access handler: report field name to value
pub type AccessOutput = BTreeMap<String, OutputValue>;

/// Output of a deletion handler.
///
/// `children` are traversed before the document's own fate is recorded.
/// When `delete_self` is set, `updates` is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionDirective {
    pub children: Vec<Locator>,
    pub delete_self: bool,
    pub updates: Vec<FieldUpdate>,
}

impl DeletionDirective {
    /// Delete the document in full
    pub fn delete() -> Self {
        Self {
            delete_self: true,
            ..Self::default()
        }
    }

    /// Keep the document and apply field updates to it
    pub fn update(updates: Vec<FieldUpdate>) -> Self {
        Self {
            updates,
            ..Self::default()
        }
    }

    /// Traverse `children` first
    pub fn with_children(mut self, children: Vec<Locator>) -> Self {
        self.children = children;
        self
    }
}

/// Application callbacks for one logical data type
pub trait TypeHandler: Send + Sync {
    /// Describe what of `document` belongs in `subject_id`'s access report
    fn handle_access(
        &self,
        subject_id: &str,
        locator: &Locator,
        document: &Document,
    ) -> PalResult<AccessOutput>;

    /// Describe how `document` takes part in erasing `subject_id`'s data
    fn handle_deletion(
        &self,
        subject_id: &str,
        locator: &Locator,
        document: &Document,
    ) -> PalResult<DeletionDirective>;
}

type AccessFn = dyn Fn(&str, &Locator, &Document) -> PalResult<AccessOutput> + Send + Sync;
type DeletionFn = dyn Fn(&str, &Locator, &Document) -> PalResult<DeletionDirective> + Send + Sync;

/// Handler built from a pair of closures
pub struct FnHandler {
    access: Box<AccessFn>,
    deletion: Box<DeletionFn>,
}

impl FnHandler {
    pub fn new<A, D>(access: A, deletion: D) -> Self
    where
        A: Fn(&str, &Locator, &Document) -> PalResult<AccessOutput> + Send + Sync + 'static,
        D: Fn(&str, &Locator, &Document) -> PalResult<DeletionDirective> + Send + Sync + 'static,
    {
        Self {
            access: Box::new(access),
            deletion: Box::new(deletion),
        }
    }
}

impl TypeHandler for FnHandler {
    fn handle_access(
        &self,
        subject_id: &str,
        locator: &Locator,
        document: &Document,
    ) -> PalResult<AccessOutput> {
        (self.access)(subject_id, locator, document)
    }

    fn handle_deletion(
        &self,
        subject_id: &str,
        locator: &Locator,
        document: &Document,
    ) -> PalResult<DeletionDirective> {
        (self.deletion)(subject_id, locator, document)
    }
}

/// Explicit data type -> handler mapping, built once and handed to the
/// engine
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TypeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler pair for `data_type`.
    ///
    /// Each data type is registered exactly once; a second registration is
    /// rejected with [`PalError::DuplicateHandler`].
    pub fn register(
        &mut self,
        data_type: impl Into<String>,
        handler: Arc<dyn TypeHandler>,
    ) -> PalResult<()> {
        let data_type = data_type.into();
        if self.handlers.contains_key(&data_type) {
            return Err(PalError::DuplicateHandler(data_type));
        }
        log::debug!("Registered handler for data type: {}", data_type);
        self.handlers.insert(data_type, handler);
        Ok(())
    }

    /// Register a pair of closures for `data_type`
    pub fn register_fn<A, D>(
        &mut self,
        data_type: impl Into<String>,
        access: A,
        deletion: D,
    ) -> PalResult<()>
    where
        A: Fn(&str, &Locator, &Document) -> PalResult<AccessOutput> + Send + Sync + 'static,
        D: Fn(&str, &Locator, &Document) -> PalResult<DeletionDirective> + Send + Sync + 'static,
    {
        self.register(data_type, Arc::new(FnHandler::new(access, deletion)))
    }

    /// Builder-style registration
    pub fn with(
        mut self,
        data_type: impl Into<String>,
        handler: Arc<dyn TypeHandler>,
    ) -> PalResult<Self> {
        self.register(data_type, handler)?;
        Ok(self)
    }

    /// Handler for `data_type`, or [`PalError::UnknownType`]
    pub fn get(&self, data_type: &str) -> PalResult<&dyn TypeHandler> {
        self.handlers
            .get(data_type)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| PalError::UnknownType(data_type.to_string()))
    }

    pub fn contains(&self, data_type: &str) -> bool {
        self.handlers.contains_key(data_type)
    }

    /// Registered data types, sorted
    pub fn data_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("data_types", &self.data_types())
            .finish()
    }
}
