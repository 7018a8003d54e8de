// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for request processing
//!
//! Every error is fail-fast: the processors never retry and never return a
//! partial report or plan. The facade wraps the first error it sees in a
//! [`RequestError`] tagged with the request category.

use std::fmt;
use thiserror::Error;

/// Errors raised while resolving locators, invoking handlers or talking to
/// a storage adapter
#[derive(Error, Debug)]
pub enum PalError {
    #[error("Invalid locator: {0}")]
    Validation(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("No handler registered for data type '{0}'")]
    UnknownType(String),

    #[error("Traversal exceeded the maximum depth of {limit} at locator {locator}")]
    DepthExceeded { limit: usize, locator: String },

    #[error("A handler is already registered for data type '{0}'")]
    DuplicateHandler(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PalError {
    /// Short category name, stable across messages
    pub fn category(&self) -> &'static str {
        match self {
            PalError::Validation(_) => "validation",
            PalError::NotFound(_) => "not_found",
            PalError::Handler(_) => "handler",
            PalError::Backend(_) => "backend",
            PalError::UnknownType(_) => "unknown_type",
            PalError::DepthExceeded { .. } => "depth_exceeded",
            PalError::DuplicateHandler(_) => "duplicate_handler",
            PalError::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for PalError {
    fn from(error: serde_json::Error) -> Self {
        PalError::Backend(format!("JSON encoding failed: {}", error))
    }
}

#[cfg(feature = "sled-backend")]
impl From<bincode::Error> for PalError {
    fn from(error: bincode::Error) -> Self {
        PalError::Backend(format!("Document encoding failed: {}", error))
    }
}

#[cfg(feature = "sled-backend")]
impl From<sled::Error> for PalError {
    fn from(error: sled::Error) -> Self {
        PalError::Backend(error.to_string())
    }
}

/// Result alias used throughout the engine
pub type PalResult<T> = Result<T, PalError>;

/// The public operation an error was raised from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Access,
    Deletion,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Access => write!(f, "access"),
            RequestKind::Deletion => write!(f, "deletion"),
        }
    }
}

/// Error returned by the engine facade
#[derive(Error, Debug)]
#[error("{kind} request failed: {source}")]
pub struct RequestError {
    pub kind: RequestKind,
    #[source]
    pub source: PalError,
}

impl RequestError {
    pub fn access(source: PalError) -> Self {
        Self {
            kind: RequestKind::Access,
            source,
        }
    }

    pub fn deletion(source: PalError) -> Self {
        Self {
            kind: RequestKind::Deletion,
            source,
        }
    }

    /// The underlying engine error
    pub fn error(&self) -> &PalError {
        &self.source
    }
}
