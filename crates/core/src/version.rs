//! Optimistic concurrency expectation for versioned state (the category order).

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Expected version of a versioned resource at the time a write is submitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// Skip version checking (the write is validated against current state only).
    Any,
    /// Require the resource to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> CatalogResult<()> {
        match self {
            ExpectedVersion::Exact(expected) if expected != actual => {
                Err(CatalogError::OrderConflict { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

impl From<Option<u64>> for ExpectedVersion {
    fn from(value: Option<u64>) -> Self {
        value.map_or(ExpectedVersion::Any, ExpectedVersion::Exact)
    }
}
