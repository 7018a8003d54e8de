// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage layer
//!
//! The [`StorageAdapter`] trait is the only way the processors reach data.
//! Two adapters are bundled:
//!
//! - [`MemoryStore`]: hierarchical path addresses, held in memory
//! - `SledStore`: flat addresses persisted with sled (`sled-backend` feature)

pub mod adapter;
pub mod factory;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod types;

pub use adapter::{FetchedDocument, StorageAdapter};
pub use factory::{open_adapter, open_adapter_named};
pub use memory::MemoryStore;
#[cfg(feature = "sled-backend")]
pub use self::sled::SledStore;
pub use types::StorageType;
