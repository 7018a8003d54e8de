// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage adapter factory
//!
//! Opens one of the bundled adapters from a [`StorageType`], so callers
//! that pick the backend from configuration get a trait object back.

use super::adapter::StorageAdapter;
use super::memory::MemoryStore;
use super::types::StorageType;
use crate::error::{PalError, PalResult};
use std::path::Path;

/// Open a bundled adapter.
///
/// `path` is where a persistent backend keeps its files; the memory store
/// ignores it.
///
/// # Examples
/// ```ignore
/// let adapter = open_adapter(StorageType::Sled, "./pal-data")?;
/// let engine = PrivacyEngine::new(adapter, registry);
/// ```
pub fn open_adapter<P: AsRef<Path>>(
    storage_type: StorageType,
    path: P,
) -> PalResult<Box<dyn StorageAdapter>> {
    log::debug!(
        "Opening {} storage adapter at {}",
        storage_type,
        path.as_ref().display()
    );
    match storage_type {
        StorageType::Memory => Ok(Box::new(MemoryStore::new())),
        #[cfg(feature = "sled-backend")]
        StorageType::Sled => {
            let store = super::sled::SledStore::open(path)?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "sled-backend"))]
        StorageType::Sled => Err(PalError::Config(
            "sled storage requires the `sled-backend` feature".to_string(),
        )),
    }
}

/// Parse a backend name and open it
pub fn open_adapter_named<P: AsRef<Path>>(
    name: &str,
    path: P,
) -> PalResult<Box<dyn StorageAdapter>> {
    let storage_type = name.parse::<StorageType>().map_err(PalError::Config)?;
    open_adapter(storage_type, path)
}
