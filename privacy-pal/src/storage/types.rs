// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Bundled backend selection

use serde::{Deserialize, Serialize};

/// Which bundled storage adapter to open
///
/// The two backends resolve different address conventions, so the choice
/// follows the shape of the application's locators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// In-process hierarchical store for path addresses
    Memory,

    /// Sled-backed flat store for flat addresses
    Sled,
}

impl Default for StorageType {
    fn default() -> Self {
        StorageType::Memory
    }
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "sled" => Ok(StorageType::Sled),
            _ => Err(format!(
                "Unknown storage type: {}. Valid options: memory, sled",
                s
            )),
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageType::Memory => "memory",
            StorageType::Sled => "sled",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("SLED".parse::<StorageType>(), Ok(StorageType::Sled));
        assert_eq!("memory".parse::<StorageType>(), Ok(StorageType::Memory));
        assert!("rocksdb".parse::<StorageType>().is_err());
        assert_eq!(StorageType::Sled.to_string(), "sled");
        assert_eq!(StorageType::default(), StorageType::Memory);
    }
}
